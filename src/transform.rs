//! Argument transforms.
//!
//! A transform turns the key of a lookup request into the ordered list of
//! parameters bound into a table's query. Transforms are looked up by name
//! in a [`TransformRegistry`] while the configuration is loaded, so a table
//! naming an unknown transform is rejected at startup rather than on the
//! first request.
//!
//! # Built-in transforms
//!
//! | Name        | Parameters for `John+Tag@Example.COM` (delimiter `+`) |
//! |-------------|--------------------------------------------------------|
//! | `all`       | `John+Tag@Example.COM`                                 |
//! | `lowercase` | `john+tag@example.com`                                 |
//! | `local`     | `john`                                                 |
//! | `domain`    | `example.com`                                          |
//! | `split`     | `john`, `example.com`                                  |
//!
//! # Example
//! ```rust
//! use socketmap_sql::config::MiscConfig;
//! use socketmap_sql::transform::{TransformError, TransformRegistry};
//!
//! let mut registry = TransformRegistry::with_builtins();
//! registry.register("reverse", |arg: &str, _: &MiscConfig| -> Result<Vec<String>, TransformError> {
//!     Ok(vec![arg.chars().rev().collect()])
//! });
//!
//! let reverse = registry.get("reverse").unwrap();
//! assert_eq!(reverse.apply("abc", &MiscConfig::default()).unwrap(), vec!["cba"]);
//! ```
use std::{collections::HashMap, fmt, sync::Arc};

use thiserror::Error;

use crate::config::MiscConfig;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("'{0}' is not an email address")]
    MissingAt(String),
    #[error("{0}")]
    Custom(String),
}

/// Maps a request key to positional query parameters.
pub trait Transform: Send + Sync {
    fn apply(&self, argument: &str, misc: &MiscConfig) -> Result<Vec<String>, TransformError>;
}

impl<F> Transform for F
where
    F: Fn(&str, &MiscConfig) -> Result<Vec<String>, TransformError> + Send + Sync,
{
    fn apply(&self, argument: &str, misc: &MiscConfig) -> Result<Vec<String>, TransformError> {
        self(argument, misc)
    }
}

/// Named transforms available to table definitions.
#[derive(Clone)]
pub struct TransformRegistry {
    transforms: HashMap<String, Arc<dyn Transform>>,
}

impl TransformRegistry {
    /// Registry without any transforms.
    pub fn empty() -> Self {
        Self {
            transforms: HashMap::new(),
        }
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::empty();
        registry.register("all", all);
        registry.register("lowercase", lowercase);
        registry.register("local", local);
        registry.register("domain", domain);
        registry.register("split", split);
        registry
    }

    /// Adds `transform` under `name`, replacing any previous entry.
    pub fn register<T>(&mut self, name: impl Into<String>, transform: T)
    where
        T: Transform + 'static,
    {
        self.transforms.insert(name.into(), Arc::new(transform));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Transform>> {
        self.transforms.get(name).cloned()
    }
}

impl Default for TransformRegistry {
    fn default() -> Self {
        Self::with_builtins()
    }
}

impl fmt::Debug for TransformRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.transforms.keys().collect();
        names.sort();
        f.debug_struct("TransformRegistry")
            .field("transforms", &names)
            .finish()
    }
}

pub fn all(argument: &str, _: &MiscConfig) -> Result<Vec<String>, TransformError> {
    Ok(vec![argument.to_string()])
}

pub fn lowercase(argument: &str, _: &MiscConfig) -> Result<Vec<String>, TransformError> {
    Ok(vec![argument.to_lowercase()])
}

pub fn local(argument: &str, misc: &MiscConfig) -> Result<Vec<String>, TransformError> {
    let (local_part, _) = split_address(argument)?;
    Ok(vec![strip_extension(local_part, misc)])
}

pub fn domain(argument: &str, _: &MiscConfig) -> Result<Vec<String>, TransformError> {
    let (_, domain) = split_address(argument)?;
    Ok(vec![domain.to_lowercase()])
}

pub fn split(argument: &str, misc: &MiscConfig) -> Result<Vec<String>, TransformError> {
    let (local_part, domain) = split_address(argument)?;
    Ok(vec![strip_extension(local_part, misc), domain.to_lowercase()])
}

fn split_address(argument: &str) -> Result<(&str, &str), TransformError> {
    argument
        .split_once('@')
        .ok_or_else(|| TransformError::MissingAt(argument.to_string()))
}

/// Drops the address extension (`user+tag` -> `user`) and lowercases.
fn strip_extension(local_part: &str, misc: &MiscConfig) -> String {
    let local_part = match misc.recipient_delimiter() {
        Some(delimiter) => local_part
            .split_once(delimiter)
            .map_or(local_part, |(user, _)| user),
        None => local_part,
    };
    local_part.to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delimited(delimiter: &str) -> MiscConfig {
        MiscConfig::from_iter([("recipient_delimiter", delimiter)])
    }

    #[test]
    fn all_is_identity() {
        let params = all("Mixed Case@Example.com", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["Mixed Case@Example.com"]);
    }

    #[test]
    fn lowercase_lowers() {
        let params = lowercase("ABC@Example.COM", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["abc@example.com"]);
    }

    #[test]
    fn local_strips_extension() {
        let params = local("user+tag@example.com", &delimited("+")).unwrap();
        assert_eq!(params, vec!["user"]);
    }

    #[test]
    fn local_without_delimiter() {
        let params = local("user+tag@example.com", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["user+tag"]);
    }

    #[test]
    fn local_ignores_blank_delimiter() {
        let params = local("User+Tag@example.com", &delimited("  ")).unwrap();
        assert_eq!(params, vec!["user+tag"]);
    }

    #[test]
    fn local_delimiter_match_is_case_sensitive() {
        let params = local("JohnXsmithxjr@example.com", &delimited("x")).unwrap();
        assert_eq!(params, vec!["johnxsmith"]);
    }

    #[test]
    fn domain_lowers() {
        let params = domain("a@B.COM", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["b.com"]);
    }

    #[test]
    fn domain_splits_on_first_at() {
        let params = domain("a@b@C", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["b@c"]);
    }

    #[test]
    fn split_address_parts() {
        let params = split("User@Example.COM", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["user", "example.com"]);

        let params = split("User+Lists@Example.COM", &delimited("+")).unwrap();
        assert_eq!(params, vec!["user", "example.com"]);
    }

    #[test]
    fn address_transforms_require_at() {
        let misc = MiscConfig::default();
        let expected = Err(TransformError::MissingAt("postmaster".to_string()));

        assert_eq!(local("postmaster", &misc), expected);
        assert_eq!(domain("postmaster", &misc), expected);
        assert_eq!(split("postmaster", &misc), expected);
    }

    #[test]
    fn registry_has_builtins() {
        let registry = TransformRegistry::with_builtins();

        for name in ["all", "lowercase", "local", "domain", "split"] {
            assert!(registry.get(name).is_some(), "missing builtin {name}");
        }
        assert!(registry.get("upper").is_none());
    }

    #[test]
    fn registry_accepts_custom_transforms() {
        let mut registry = TransformRegistry::empty();
        registry.register(
            "plugins.mail:user_and_domain",
            |arg: &str, _: &MiscConfig| -> Result<Vec<String>, TransformError> {
                Ok(arg.split('@').map(str::to_string).collect())
            },
        );

        let transform = registry.get("plugins.mail:user_and_domain").unwrap();
        let params = transform.apply("a@b", &MiscConfig::default()).unwrap();
        assert_eq!(params, vec!["a", "b"]);
        assert!(registry.get("all").is_none());
    }
}
