//! 页码映射 - 业务能力层
//!
//! 纯函数：闪卡编号 → PDF 页码。映射本身不知道文档有多少页，
//! 越界过滤由调用方在打开文档之后单独做。

use rand::seq::SliceRandom;
use rand::Rng;

use crate::models::SectionMap;

/// `page = 2 * card + offset`
///
/// 调用方保证 `card` 在章节范围内；这里不做截断。
pub fn map_card_to_page(section: &SectionMap, card: u32) -> i64 {
    2 * i64::from(card) + i64::from(section.offset)
}

/// 章节内全部闪卡编号，整体洗牌
///
/// 洗的是整个范围（Fisher–Yates），同一次生成里不会重复，
/// 候选不够时也能按这个顺序遍历完整个章节。
pub fn shuffled_cards<R: Rng + ?Sized>(section: &SectionMap, rng: &mut R) -> Vec<u32> {
    let mut cards: Vec<u32> = (section.start_card()..=section.end_card()).collect();
    cards.shuffle(rng);
    cards
}

/// 洗牌后的候选页码（未过滤）
pub fn candidate_pages<R: Rng + ?Sized>(section: &SectionMap, rng: &mut R) -> Vec<i64> {
    shuffled_cards(section, rng)
        .into_iter()
        .map(|card| map_card_to_page(section, card))
        .collect()
}

/// 保留 `[1, total_pages]` 内的页码，顺序不变
pub fn filter_in_bounds(pages: &[i64], total_pages: u32) -> Vec<u32> {
    pages
        .iter()
        .filter(|&&page| page >= 1 && page <= i64::from(total_pages))
        .map(|&page| page as u32)
        .collect()
}
