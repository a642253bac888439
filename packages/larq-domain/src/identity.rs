/// Length of a ledger identity: a fixed-width alphanumeric address string.
pub const IDENTITY_LEN: usize = 60;

/// An identity is exactly [`IDENTITY_LEN`] ASCII uppercase letters or digits.
pub fn is_valid_identity(value: &str) -> bool {
	value.len() == IDENTITY_LEN
		&& value.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}

/// Transaction ids share the identity alphabet but are carried lowercase.
pub fn is_valid_tx_id(value: &str) -> bool {
	value.len() == IDENTITY_LEN
		&& value.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
}
