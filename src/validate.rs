//! Input validation for identifiers, names, passwords and seat counts.
use crate::config::{ID_CAPACITY, MAX_SEATS, NAME_CAPACITY, PASSWORD_CAPACITY};
use crate::{RegistryError, Result};

/// identifiers are 1 to 9 ASCII letters or digits
pub fn id(value: &str) -> Result<()> {
    if value.is_empty() || value.len() >= ID_CAPACITY {
        return Err(RegistryError::InvalidInput(format!(
            "identifier must be 1 to {} characters",
            ID_CAPACITY - 1
        )));
    }
    if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(RegistryError::InvalidInput(format!(
            "identifier {:?} must be alphanumeric",
            value
        )));
    }
    Ok(())
}

/// names are 1 to 49 letters, spaces or dots
pub fn name(value: &str) -> Result<()> {
    if value.is_empty() || value.len() >= NAME_CAPACITY {
        return Err(RegistryError::InvalidInput(format!(
            "name must be 1 to {} characters",
            NAME_CAPACITY - 1
        )));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphabetic() || c == ' ' || c == '.')
    {
        return Err(RegistryError::InvalidInput(format!(
            "name {:?} may only contain letters, spaces and dots",
            value
        )));
    }
    Ok(())
}

/// passwords are 1 to 49 bytes of anything but NUL
pub fn password(value: &str) -> Result<()> {
    if value.is_empty() || value.len() >= PASSWORD_CAPACITY || value.contains('\0') {
        return Err(RegistryError::InvalidInput(format!(
            "password must be 1 to {} characters",
            PASSWORD_CAPACITY - 1
        )));
    }
    Ok(())
}

/// a course has between 1 and [`MAX_SEATS`] seats
pub fn seats(value: u32) -> Result<()> {
    if value == 0 || value as usize > MAX_SEATS {
        return Err(RegistryError::InvalidInput(format!(
            "seat count must be between 1 and {}",
            MAX_SEATS
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids() {
        assert!(id("s1").is_ok());
        assert!(id("abcdefghi").is_ok());
        assert!(id("abcdefghij").is_err());
        assert!(id("").is_err());
        assert!(id("s-1").is_err());
    }

    #[test]
    fn names() {
        assert!(name("Dr. Smith").is_ok());
        assert!(name("R2D2").is_err());
        assert!(name(&"a".repeat(49)).is_ok());
        assert!(name(&"a".repeat(50)).is_err());
    }

    #[test]
    fn passwords_and_seats() {
        assert!(password("p@ss w0rd!").is_ok());
        assert!(password("").is_err());
        assert!(seats(1).is_ok());
        assert!(seats(100).is_ok());
        assert!(seats(0).is_err());
        assert!(seats(101).is_err());
    }
}
