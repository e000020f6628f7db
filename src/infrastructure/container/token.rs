//! 解析令牌
//!
//! `Token<T>` 在类型层面把名称与值类型绑定；运行时只保留名称。

use std::fmt;
use std::marker::PhantomData;

/// 带类型的服务令牌
///
/// 以常量声明一次，注册与解析都使用同一个令牌：
///
/// ```
/// use ndulo::Token;
///
/// struct Database;
/// const DATABASE: Token<Database> = Token::new("database");
/// assert_eq!(DATABASE.name(), "database");
/// ```
pub struct Token<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Token<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for Token<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Token<T> {}

impl<T> PartialEq for Token<T> {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl<T> Eq for Token<T> {}

impl<T> fmt::Debug for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("name", &self.name)
            .field("type", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T> fmt::Display for Token<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

impl<T> AsRef<str> for Token<T> {
    fn as_ref(&self) -> &str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Database;

    const DATABASE: Token<Database> = Token::new("database");

    #[test]
    fn test_token_is_copy_without_value_bounds() {
        let copy = DATABASE;
        assert_eq!(copy, DATABASE);
        assert_eq!(copy.name(), "database");
        assert_eq!(copy.to_string(), "database");
    }

    #[test]
    fn test_token_debug_names_value_type() {
        let rendered = format!("{:?}", DATABASE);
        assert!(rendered.contains("database"));
        assert!(rendered.contains("Database"));
    }
}
