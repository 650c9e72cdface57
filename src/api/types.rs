use serde::{Deserialize, Serialize};

/// A book as the server stores it. `author` references a user id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Book {
    pub id: u64,
    pub title: String,
    pub author: u64,
}

/// Payload for `POST books/`. The server assigns the id.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: u64,
}

/// Payload for `dj-rest-auth/login/`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Payload for `dj-rest-auth/registration/`. `password2` is the confirmation.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// What the auth endpoints answer with on success.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenResponse {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_list_deserializes() {
        let json = r#"[{"id":1,"title":"X","author":1},{"id":2,"title":"Y","author":2}]"#;
        let books: Vec<Book> = serde_json::from_str(json).unwrap();
        assert_eq!(books.len(), 2);
        assert_eq!(
            books[0],
            Book {
                id: 1,
                title: "X".into(),
                author: 1
            }
        );
    }

    #[test]
    fn test_token_response_ignores_extra_fields() {
        let json = r#"{"key":"abc","user":7}"#;
        let token: TokenResponse = serde_json::from_str(json).unwrap();
        assert_eq!(token.key, "abc");
    }

    #[test]
    fn test_registration_field_names() {
        let reg = Registration {
            username: "Pierre".into(),
            email: "pierre@email.com".into(),
            password1: "password".into(),
            password2: "password".into(),
        };
        let value = serde_json::to_value(&reg).unwrap();
        assert_eq!(value["password1"], "password");
        assert_eq!(value["password2"], "password");
    }
}
