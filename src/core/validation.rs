//! # Form Validation
//!
//! Client-side checks run before anything reaches the network. Each form
//! validates into the payload type its endpoint expects.

use std::fmt;

use crate::api::types::{Book, Credentials, NewBook, Registration};

/// Shortest accepted username, password and book title.
pub const MIN_LENGTH: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

fn require_min(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len == 0 {
        return Err(ValidationError::new(field, "Required"));
    }
    if len < MIN_LENGTH {
        return Err(ValidationError::new(
            field,
            format!("Must be at least {MIN_LENGTH} characters"),
        ));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::new("email", "Required"));
    }
    let valid = match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ValidationError::new("email", "email is not valid"));
    }
    Ok(())
}

#[derive(Debug, Clone, Default)]
pub struct SignInForm {
    pub username: String,
    pub email: String,
    pub password: String,
}

impl SignInForm {
    pub fn validate(&self) -> Result<Credentials, ValidationError> {
        require_min("username", &self.username)?;
        require_email(&self.email)?;
        require_min("password", &self.password)?;
        Ok(Credentials {
            username: self.username.clone(),
            email: self.email.clone(),
            password: self.password.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm: String,
}

impl SignUpForm {
    pub fn validate(&self) -> Result<Registration, ValidationError> {
        require_min("username", &self.username)?;
        require_email(&self.email)?;
        require_min("password", &self.password)?;
        if self.confirm != self.password {
            return Err(ValidationError::new("confirm", "Passwords do not match"));
        }
        Ok(Registration {
            username: self.username.clone(),
            email: self.email.clone(),
            password1: self.password.clone(),
            password2: self.confirm.clone(),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BookForm {
    pub title: String,
    pub author: u64,
}

impl BookForm {
    pub fn validate(&self) -> Result<NewBook, ValidationError> {
        let title = self.title.trim();
        require_min("title", title)?;
        if self.author == 0 {
            return Err(ValidationError::new("author", "Required"));
        }
        Ok(NewBook {
            title: title.to_string(),
            author: self.author,
        })
    }

    /// Validates as an edit of the book with `id`.
    pub fn validate_update(&self, id: u64) -> Result<Book, ValidationError> {
        if id == 0 {
            return Err(ValidationError::new("id", "Required"));
        }
        let NewBook { title, author } = self.validate()?;
        Ok(Book { id, title, author })
    }
}
