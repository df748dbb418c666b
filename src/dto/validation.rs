//! Validation helpers for DTOs and path parameters.

use validator::ValidationError;

/// Length of a room join code.
pub const ROOM_CODE_LENGTH: usize = 12;

/// Validates that a room code is exactly 12 lowercase hexadecimal characters.
///
/// # Examples
///
/// ```ignore
/// validate_room_code("deadbeef0001") // Ok
/// validate_room_code("DeadBeef0001") // Err - uppercase
/// validate_room_code("deadbeef001")  // Err - too short
/// ```
pub fn validate_room_code(code: &str) -> Result<(), ValidationError> {
    if code.len() != ROOM_CODE_LENGTH {
        let mut err = ValidationError::new("room_code_length");
        err.message =
            Some(format!("Room code must be exactly {ROOM_CODE_LENGTH} characters (got {})", code.len()).into());
        return Err(err);
    }

    if !code
        .chars()
        .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase())
    {
        let mut err = ValidationError::new("room_code_format");
        err.message = Some("Room code must contain only lowercase hexadecimal characters".into());
        return Err(err);
    }

    Ok(())
}
