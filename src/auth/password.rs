use bcrypt::{hash, verify};

use crate::errors::{AppError, Result};

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str, cost: u32) -> Result<String> {
        hash(password, cost).map_err(|e| AppError::Internal(anyhow::anyhow!("Error hashing password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Error verifying password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<()> {
        if password.len() < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters long".to_string(),
            ));
        }

        let checks = [
            (password.chars().any(|c| c.is_uppercase()), "an uppercase letter"),
            (password.chars().any(|c| c.is_lowercase()), "a lowercase letter"),
            (password.chars().any(|c| c.is_ascii_digit()), "a digit"),
        ];

        for (satisfied, requirement) in checks {
            if !satisfied {
                return Err(AppError::Validation(format!(
                    "Password must contain at least {}",
                    requirement
                )));
            }
        }

        Ok(())
    }

    pub fn validate_username(username: &str) -> Result<()> {
        let length_ok = (3..=64).contains(&username.len());
        let charset_ok = username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');

        if !length_ok || !charset_ok {
            return Err(AppError::Validation(
                "Username must be 3-64 characters of letters, digits, '_' or '-'".to_string(),
            ));
        }

        Ok(())
    }
}
