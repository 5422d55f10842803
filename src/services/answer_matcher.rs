//! 答案判定服务 - 业务能力层
//!
//! 严格但容错的简答题判分：忽略大小写、首尾空白和常见标点。
//!
//! 判定是不对称的：学员多写（答案里包含标准答案）直接算对；
//! 学员少写（只写了标准答案的一部分）则要求长度至少达到标准答案的一半。

use regex::Regex;
use std::sync::LazyLock;

/// 需要去掉的标点：`. , / # ! $ % ^ & * ; : { } = - _ ` ~ ( )`
static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,/#!$%\^&*;:{}=\-_`~()]").expect("valid punctuation regex"));

/// 连续 2 个及以上空白
static EXTRA_SPACES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("valid whitespace regex"));

/// 短于该长度且不完全相同的答案直接判错
pub const MIN_PARTIAL_ANSWER_CHARS: usize = 3;

/// 学员答案是标准答案子串时，需要达到的长度比例
pub const PARTIAL_ANSWER_RATIO: f64 = 0.5;

/// 归一化答案文本
pub fn normalize_answer(text: &str) -> String {
    let lowered = text.trim().to_lowercase();
    let stripped = PUNCTUATION.replace_all(&lowered, "");
    EXTRA_SPACES.replace_all(&stripped, " ").into_owned()
}

/// 判断学员答案是否正确
///
/// 按顺序判定，命中即返回：
/// 1. 归一化后为空 → 错
/// 2. 完全相同 → 对
/// 3. 少于 3 个字符 → 错
/// 4. 标准答案包含学员答案 → 长度 ≥ 标准答案的 50% 才算对
/// 5. 学员答案包含标准答案 → 对
/// 6. 其他 → 错
pub fn is_correct(user_answer: &str, correct_answer: &str) -> bool {
    let user = normalize_answer(user_answer);
    let correct = normalize_answer(correct_answer);

    if user.is_empty() {
        return false;
    }

    if user == correct {
        return true;
    }

    let user_len = user.chars().count();
    if user_len < MIN_PARTIAL_ANSWER_CHARS {
        return false;
    }

    if correct.contains(&user) {
        let correct_len = correct.chars().count();
        return user_len as f64 >= correct_len as f64 * PARTIAL_ANSWER_RATIO;
    }

    user.contains(&correct)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_answer() {
        assert_eq!(normalize_answer("  Xương   Đùi. "), "xương đùi");
        assert_eq!(normalize_answer("(Động-mạch) chủ!"), "độngmạch chủ");
        assert_eq!(normalize_answer("a,b;c:d{e}f=g_h`i~j"), "abcdefghij");
    }

    #[test]
    fn test_case_insensitive_exact_match() {
        assert!(is_correct("Xương đùi", "xương đùi"));
        assert!(is_correct("XƯƠNG ĐÙI.", "xương đùi"));
    }

    #[test]
    fn test_empty_answer_is_wrong() {
        assert!(!is_correct("", "bất kỳ"));
        assert!(!is_correct("  ...  ", "bất kỳ"));
    }

    #[test]
    fn test_too_short_answer_is_wrong() {
        assert!(!is_correct("x", "xương"));
        assert!(!is_correct("xu", "xương"));
    }

    #[test]
    fn test_short_exact_answer_is_right() {
        // 完全相同优先于长度检查
        assert!(is_correct("ct", "CT"));
    }

    #[test]
    fn test_partial_answer_ratio() {
        // "xương" 5 字符，"xương đùi" 9 字符：5 >= 4.5
        assert!(is_correct("xương", "xương đùi"));
        // "đùi" 3 字符 < 4.5
        assert!(!is_correct("đùi", "xương đùi"));
        // 正好一半
        assert!(is_correct("abc", "abcdef"));
        assert!(!is_correct("abc", "abcdefg"));
    }

    #[test]
    fn test_user_superstring_is_right() {
        assert!(is_correct("xương đùi trái", "xương đùi"));
        assert!(is_correct("Đây là động mạch chủ ngực", "động mạch chủ"));
    }

    #[test]
    fn test_unrelated_answer_is_wrong() {
        assert!(!is_correct("xương chày", "xương đùi"));
    }
}
