use std::net::IpAddr;
use validator::ValidationError;

/// Longest category name accepted from a user, in characters
pub const MAX_CATEGORY_NAME_LENGTH: usize = 50;

/// Validates that a category name has visible text and a sane length
pub fn validate_category_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        let mut error = ValidationError::new("empty_name");
        error.message = Some("Please enter a category name".into());
        return Err(error);
    }
    if trimmed.chars().count() > MAX_CATEGORY_NAME_LENGTH {
        let mut error = ValidationError::new("name_too_long");
        error.message = Some(
            format!(
                "Category name must be at most {} characters",
                MAX_CATEGORY_NAME_LENGTH
            )
            .into(),
        );
        return Err(error);
    }
    Ok(())
}

/// Validates that a color is a `#RRGGBB` hex code
pub fn validate_color(color: &str) -> Result<(), ValidationError> {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());

    if !valid {
        let mut error = ValidationError::new("invalid_color");
        error.message = Some(format!("'{}' is not a #RRGGBB color", color).into());
        return Err(error);
    }
    Ok(())
}

/// Validates that a string is an IPv4 or IPv6 address
pub fn validate_ip_address(ip: &str) -> Result<(), ValidationError> {
    ip.parse::<IpAddr>().map_err(|_| {
        let mut error = ValidationError::new("invalid_ip");
        error.message = Some(format!("'{}' is not a valid IP address", ip).into());
        error
    })?;
    Ok(())
}
