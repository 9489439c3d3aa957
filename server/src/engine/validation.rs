use super::error::ServerError;

/// A name is valid when it is non-empty and made only of letters and digits.
/// Applies to both nicknames and channel names.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(char::is_alphanumeric)
}

/// Validate a nickname requested through a rename.
pub fn validate_nickname(nick: &str) -> Result<(), ServerError> {
    if !is_valid_name(nick) {
        return Err(ServerError::InvalidName);
    }
    Ok(())
}

/// Validate the name of a channel being created.
pub fn validate_channel_name(name: &str) -> Result<(), ServerError> {
    if !is_valid_name(name) {
        return Err(ServerError::InvalidName);
    }
    Ok(())
}
