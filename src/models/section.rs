//! 章节映射表
//!
//! 每个章节把一段闪卡编号映射到参考 PDF 的页码：`page = 2 * card + offset`。
//! 内置的是 Gray's Anatomy 闪卡的章节表，也可以从 TOML 加载自定义表。

use phf::phf_ordered_map;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::ConfigError;

/// 章节映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionMap {
    /// 章节 ID（全局唯一）
    pub id: String,
    /// 显示名称
    pub name: String,
    /// 闪卡编号范围（闭区间）
    pub range: (u32, u32),
    /// 页码公式中的常数 b
    #[serde(alias = "b")]
    pub offset: i32,
    /// 界面提示用的关键词，不参与页码计算
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl SectionMap {
    pub fn start_card(&self) -> u32 {
        self.range.0
    }

    pub fn end_card(&self) -> u32 {
        self.range.1
    }

    /// 范围内的闪卡数量
    pub fn card_count(&self) -> usize {
        if self.range.0 > self.range.1 {
            return 0;
        }
        (self.range.1 - self.range.0) as usize + 1
    }

    /// 主题中按整词命中的最长关键词（字符数），没有命中时为 `None`
    pub fn keyword_match_len(&self, topic: &str) -> Option<usize> {
        let topic_words = words(topic);
        self.keywords
            .iter()
            .filter(|kw| {
                let kw_words = words(kw);
                !kw_words.is_empty()
                    && topic_words
                        .windows(kw_words.len())
                        .any(|window| window == kw_words.as_slice())
            })
            .map(|kw| kw.chars().count())
            .max()
    }

    /// 主题是否整词命中本章节的任一关键词
    pub fn matches_topic(&self, topic: &str) -> bool {
        self.keyword_match_len(topic).is_some()
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let (start, end) = self.range;
        if start == 0 || start > end {
            return Err(ConfigError::InvalidSectionRange {
                id: self.id.clone(),
                start,
                end,
            });
        }
        Ok(())
    }
}

/// 小写后按非字母数字切词
fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

/// 内置章节的静态描述
struct SectionSeed {
    name: &'static str,
    range: (u32, u32),
    offset: i32,
    keywords: &'static [&'static str],
}

static GRAYS_SECTIONS: phf::OrderedMap<&'static str, SectionSeed> = phf_ordered_map! {
    "overview" => SectionSeed {
        name: "1. Overview (Tổng quan)",
        range: (1, 8),
        offset: 12,
        keywords: &["overview", "tổng quan", "nhập môn"],
    },
    "back" => SectionSeed {
        name: "2. Back (Lưng & Cột sống)",
        range: (9, 34),
        offset: 14,
        keywords: &["back", "lưng", "cột sống", "đốt sống", "vertebra", "spine"],
    },
    "thorax" => SectionSeed {
        name: "3. Thorax (Ngực)",
        range: (35, 74),
        offset: 16,
        keywords: &["thorax", "ngực", "tim", "phổi", "trung thất", "heart", "lung", "mediastinum"],
    },
    "abdomen" => SectionSeed {
        name: "4. Abdomen (Bụng)",
        range: (75, 113),
        offset: 18,
        keywords: &["abdomen", "bụng", "dạ dày", "gan", "ruột", "thận", "stomach", "liver", "kidney"],
    },
    "pelvis" => SectionSeed {
        name: "5. Pelvis (Chậu hông)",
        range: (114, 133),
        offset: 20,
        keywords: &["pelvis", "chậu", "sinh dục", "tiết niệu", "perineum", "đáy chậu"],
    },
    "lower" => SectionSeed {
        name: "6. Lower Limb (Chi dưới)",
        range: (134, 191),
        offset: 22,
        keywords: &["lower", "chi dưới", "chân", "đùi", "cẳng chân", "bàn chân", "leg", "foot", "femur"],
    },
    "upper" => SectionSeed {
        name: "7. Upper Limb (Chi trên)",
        range: (192, 258),
        offset: 24,
        keywords: &["upper", "chi trên", "tay", "cánh tay", "vai", "arm", "hand", "shoulder"],
    },
    "head" => SectionSeed {
        name: "8. Head & Neck (Đầu Mặt Cổ)",
        range: (259, 349),
        offset: 28,
        keywords: &["head", "neck", "đầu", "mặt", "cổ", "sọ", "thần kinh sọ", "cranial", "skull", "face"],
    },
    "surface" => SectionSeed {
        name: "9. Surface Anatomy (Bề mặt)",
        range: (350, 369),
        offset: 30,
        keywords: &["surface", "bề mặt"],
    },
    "nervous" => SectionSeed {
        name: "10. Nervous System (Thần kinh)",
        range: (370, 377),
        offset: 32,
        keywords: &["nervous", "thần kinh", "não", "tủy", "brain", "spinal"],
    },
    "imaging" => SectionSeed {
        name: "11. Imaging (Hình ảnh học)",
        range: (378, 391),
        offset: 34,
        keywords: &["imaging", "hình ảnh", "x-quang", "ct", "mri", "radiograph"],
    },
};

/// 章节表
///
/// 构造后不可变，保证 ID 唯一、范围合法。范围允许跨章节重叠。
#[derive(Debug, Clone)]
pub struct SectionCatalog {
    sections: Vec<SectionMap>,
}

impl SectionCatalog {
    /// 内置的 Gray's Anatomy 闪卡章节表
    pub fn builtin() -> Self {
        let sections = GRAYS_SECTIONS
            .entries()
            .map(|(id, seed)| SectionMap {
                id: (*id).to_string(),
                name: seed.name.to_string(),
                range: seed.range,
                offset: seed.offset,
                keywords: seed.keywords.iter().map(|kw| kw.to_string()).collect(),
            })
            .collect();
        Self { sections }
    }

    /// 从任意章节列表构造（会做校验）
    pub fn from_sections(sections: Vec<SectionMap>) -> Result<Self, ConfigError> {
        let mut seen = HashSet::new();
        for section in &sections {
            section.validate()?;
            if !seen.insert(section.id.as_str()) {
                return Err(ConfigError::DuplicateSectionId {
                    id: section.id.clone(),
                });
            }
        }
        Ok(Self { sections })
    }

    pub fn get(&self, id: &str) -> Option<&SectionMap> {
        self.sections.iter().find(|s| s.id == id)
    }

    /// 按 ID 查找，找不到时返回配置错误
    pub fn require(&self, id: &str) -> Result<&SectionMap, ConfigError> {
        self.get(id).ok_or_else(|| ConfigError::UnknownSection { id: id.to_string() })
    }

    /// 根据主题关键词推荐章节，只用于提示
    ///
    /// 关键词按整词匹配，取命中关键词最长的章节；一样长时取表中靠前的。
    pub fn suggest(&self, topic: &str) -> Option<&SectionMap> {
        let mut best: Option<(&SectionMap, usize)> = None;
        for section in &self.sections {
            if let Some(len) = section.keyword_match_len(topic) {
                if best.map_or(true, |(_, best_len)| len > best_len) {
                    best = Some((section, len));
                }
            }
        }
        best.map(|(section, _)| section)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SectionMap> {
        self.sections.iter()
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl Default for SectionCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_catalog_order_and_constants() {
        let catalog = SectionCatalog::builtin();
        assert_eq!(catalog.len(), 11);

        let ids: Vec<&str> = catalog.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids.first(), Some(&"overview"));
        assert_eq!(ids.last(), Some(&"imaging"));

        let head = catalog.get("head").unwrap();
        assert_eq!(head.range, (259, 349));
        assert_eq!(head.offset, 28);
        assert_eq!(head.card_count(), 91);
    }

    #[test]
    fn test_builtin_catalog_passes_validation() {
        let sections: Vec<SectionMap> = SectionCatalog::builtin().iter().cloned().collect();
        assert!(SectionCatalog::from_sections(sections).is_ok());
    }

    #[test]
    fn test_duplicate_id_rejected() {
        let back = SectionCatalog::builtin().get("back").unwrap().clone();
        let err = SectionCatalog::from_sections(vec![back.clone(), back]).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSectionId { .. }));
    }

    #[test]
    fn test_invalid_range_rejected() {
        let section = SectionMap {
            id: "bad".into(),
            name: "Bad".into(),
            range: (10, 5),
            offset: 0,
            keywords: vec![],
        };
        let err = SectionCatalog::from_sections(vec![section]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidSectionRange { .. }));
    }

    #[test]
    fn test_suggest_by_keyword() {
        let catalog = SectionCatalog::builtin();
        assert_eq!(catalog.suggest("Xương Đùi và khớp gối").map(|s| s.id.as_str()), Some("lower"));
        assert_eq!(catalog.suggest("Heart chambers").map(|s| s.id.as_str()), Some("thorax"));
        assert!(catalog.suggest("   ").is_none());
    }

    #[test]
    fn test_suggest_prefers_longest_whole_word_keyword() {
        let catalog = SectionCatalog::builtin();
        let id = |topic: &str| catalog.suggest(topic).map(|s| s.id.as_str());

        // "bề mặt" 比 head 的 "mặt" 更长
        assert_eq!(id("Giải phẫu bề mặt"), Some("surface"));
        assert_eq!(id("Hình ảnh học CT sọ"), Some("imaging"));
        assert_eq!(id("Đốt sống cổ"), Some("back"));
        // 只按整词匹配
        assert_eq!(id("doctor"), None);
        assert!(!catalog.get("thorax").unwrap().matches_topic("timeline"));
    }

    #[test]
    fn test_card_count_of_reversed_range_is_zero() {
        let section = SectionMap {
            id: "rev".into(),
            name: "Rev".into(),
            range: (10, 5),
            offset: 0,
            keywords: vec![],
        };
        assert_eq!(section.card_count(), 0);
    }

    #[test]
    fn test_require_unknown_section() {
        let catalog = SectionCatalog::builtin();
        assert!(matches!(
            catalog.require("tail"),
            Err(ConfigError::UnknownSection { .. })
        ));
    }
}
