//! 注册信息校验：邮箱格式与密码策略

use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(\.[A-Za-z0-9-]+)*\.[A-Za-z]{2,}$")
        .expect("Invalid email regex")
});

const MIN_PASSWORD_LEN: usize = 8;
const MAX_PASSWORD_LEN: usize = 128;

// 忽略大小写比较
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "12345678",
    "123456789",
    "qwerty123",
    "abcd1234",
    "letmein1",
    "student1",
    "welcome1",
];

/// 邮箱统一小写并去掉首尾空白，登录与注册共用
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub fn validate_email(email: &str) -> Result<(), &'static str> {
    if email.len() > 254 || !EMAIL_RE.is_match(email) {
        return Err("Email format is invalid");
    }
    Ok(())
}

/// 列出密码违反的全部规则
///
/// 大小写规则接受任意 Unicode 字母，数字规则只认 ASCII 数字。
pub fn password_violations(password: &str) -> Vec<&'static str> {
    let length = password.chars().count();
    let rules: [(bool, &'static str); 6] = [
        (
            length < MIN_PASSWORD_LEN,
            "Password must be at least 8 characters long",
        ),
        (
            length > MAX_PASSWORD_LEN,
            "Password must be at most 128 characters long",
        ),
        (
            !password.chars().any(char::is_uppercase),
            "Password must contain at least one uppercase letter",
        ),
        (
            !password.chars().any(char::is_lowercase),
            "Password must contain at least one lowercase letter",
        ),
        (
            !password.chars().any(|c| c.is_ascii_digit()),
            "Password must contain at least one digit",
        ),
        (
            COMMON_PASSWORDS
                .iter()
                .any(|weak| password.eq_ignore_ascii_case(weak)),
            "Password is too common, please choose a stronger password",
        ),
    ];

    rules
        .into_iter()
        .filter_map(|(violated, message)| violated.then_some(message))
        .collect()
}

pub fn validate_password(password: &str) -> Result<(), String> {
    let violations = password_violations(password);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_format() {
        assert!(validate_email("jane.doe@uni.edu").is_ok());
        assert!(validate_email("lecturer+cs@dept.uni.ac.uk").is_ok());
        assert!(validate_email("no-at-sign.edu").is_err());
        assert!(validate_email("missing@tld").is_err());
        assert!(validate_email("two@@uni.edu").is_err());
    }

    #[test]
    fn test_normalize_email() {
        assert_eq!(normalize_email("  Jane.Doe@Uni.EDU "), "jane.doe@uni.edu");
    }

    #[test]
    fn test_strong_passwords() {
        assert!(validate_password("Coursework42").is_ok());
        assert!(validate_password("SecureP@ss1").is_ok());
    }

    #[test]
    fn test_all_violations_reported() {
        let err = validate_password("short").unwrap_err();
        assert!(err.contains("at least 8 characters"));
        assert!(err.contains("uppercase"));
        assert!(err.contains("digit"));
        assert!(err.contains("; "));
    }

    #[test]
    fn test_common_password_rejected() {
        assert_eq!(
            password_violations("Password1"),
            vec!["Password is too common, please choose a stronger password"]
        );
    }

    #[test]
    fn test_length_counts_characters() {
        // 多字节字符按字符计数
        assert!(password_violations("Äbcdefg1").is_empty());
        assert!(!password_violations(&format!("Ab1{}", "x".repeat(200))).is_empty());
    }

    #[test]
    fn test_case_rules_accept_non_ascii_letters() {
        assert!(password_violations("ÉCOLEÉTÉ9ü").is_empty());
        assert_eq!(
            password_violations("ÄÖÜÄÖÜÄ1"),
            vec!["Password must contain at least one lowercase letter"]
        );
        // 无大小写的文字不满足大小写规则
        assert_eq!(password_violations("密码密码密码密码1").len(), 2);
    }
}
