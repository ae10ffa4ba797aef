// cnshield-core/src/anonymizer.rs
//! Format-preserving masking of detected entities.
//!
//! [`mask_value`] is the per-type mask table. [`anonymize`] applies it to a
//! text: results of different types may overlap, so the lower-priority span
//! of any overlapping pair is left out of masking (it stays in the detection
//! results). Replacements are applied right to left so that earlier offsets
//! stay valid whatever the replacement length.
//!
//! License: MIT OR APACHE 2.0

use cnshield_context::heuristics::surname_len;
use serde::{Deserialize, Serialize};

use crate::entity::EntityType;
use crate::span::{log_mask_action_debug, ResolvedResult};
use crate::text::CharIndexMapper;

pub const DEFAULT_FILLER: char = '*';

/// One masked region. Offsets are char offsets into the original text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskedSpan {
    pub entity_type: EntityType,
    pub start: usize,
    pub end: usize,
    pub masked: String,
}

/// Whether the type's mask may change the char length of the value.
pub fn is_length_changing(entity_type: &EntityType) -> bool {
    matches!(entity_type, EntityType::BankCard | EntityType::Email)
}

fn fill(filler: char, n: usize) -> String {
    std::iter::repeat(filler).take(n).collect()
}

/// Keeps `head` leading and `tail` trailing chars and fills the middle.
fn keep_ends(chars: &[char], head: usize, tail: usize, filler: char) -> String {
    let n = chars.len();
    if head + tail >= n {
        return fill(filler, n);
    }
    let mut out: String = chars[..head].iter().collect();
    out.push_str(&fill(filler, n - head - tail));
    out.extend(&chars[n - tail..]);
    out
}

/// Length of a leading `+86`/`0086` country code plus the separators after it.
fn country_code_len(chars: &[char]) -> usize {
    let code = if chars.starts_with(&['+', '8', '6']) {
        3
    } else if chars.starts_with(&['0', '0', '8', '6']) {
        4
    } else {
        return 0;
    };
    code + chars[code..].iter().take_while(|c| matches!(c, ' ' | '-')).count()
}

fn mask_phone(chars: &[char], filler: char) -> String {
    let code = country_code_len(chars);
    if code > 0 && code < chars.len() {
        let mut out: String = chars[..code].iter().collect();
        out.push_str(&mask_phone(&chars[code..], filler));
        return out;
    }
    if chars.len() == 11 {
        return keep_ends(chars, 3, 4, filler);
    }
    let digits = chars.iter().filter(|c| c.is_ascii_digit()).count();
    let mut seen = 0;
    chars
        .iter()
        .map(|&c| {
            if !c.is_ascii_digit() {
                return c;
            }
            seen += 1;
            if digits > 7 && (seen <= 3 || seen > digits - 4) {
                c
            } else {
                filler
            }
        })
        .collect()
}

fn mask_bank_card(chars: &[char], filler: char) -> String {
    let n = chars.len();
    if n >= 16 {
        let group = fill(filler, 4);
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[n - 4..].iter().collect();
        format!("{head} {group} {group} {tail}")
    } else if n > 8 {
        let head: String = chars[..4].iter().collect();
        let tail: String = chars[n - 4..].iter().collect();
        format!("{head}{}{tail}", fill(filler, 4))
    } else {
        fill(filler, n)
    }
}

fn mask_email(value: &str, filler: char) -> String {
    let stars = fill(filler, 3);
    match value.split_once('@') {
        Some((local, domain)) => {
            let keep = if local.chars().count() <= 3 { 1 } else { 3 };
            let head: String = local.chars().take(keep).collect();
            format!("{head}{stars}@{domain}")
        }
        None => {
            let head: String = value.chars().take(3).collect();
            format!("{head}{stars}")
        }
    }
}

fn mask_person(value: &str, chars: &[char], filler: char) -> String {
    let keep = surname_len(value).min(chars.len());
    let mut out: String = chars[..keep].iter().collect();
    out.push_str(&fill(filler, chars.len() - keep));
    out
}

/// Masks one matched value according to its entity type.
pub fn mask_value(entity_type: &EntityType, value: &str, filler: char) -> String {
    let chars: Vec<char> = value.chars().collect();
    let n = chars.len();
    match entity_type {
        EntityType::Phone => mask_phone(&chars, filler),
        EntityType::IdCard => keep_ends(&chars, 4, 4, filler),
        EntityType::BankCard => mask_bank_card(&chars, filler),
        EntityType::Email => mask_email(value, filler),
        EntityType::Person => mask_person(value, &chars, filler),
        EntityType::Passport | EntityType::DriverLicense | EntityType::MilitaryId => {
            keep_ends(&chars, 2, 2, filler)
        }
        EntityType::VehiclePlate if n >= 7 => keep_ends(&chars, 2, 1, filler),
        EntityType::VehiclePlate => keep_ends(&chars, 2, 0, filler),
        EntityType::Location if n > 10 => keep_ends(&chars, 6, 0, filler),
        EntityType::Location => keep_ends(&chars, n / 2, 0, filler),
        _ => fill(filler, n),
    }
}

/// Picks the results to mask: no two chosen spans overlap. Higher score wins,
/// then earlier recognizer registration, then the longer span.
fn select_for_masking(results: &[ResolvedResult]) -> Vec<&ResolvedResult> {
    let mut ranked: Vec<&ResolvedResult> = results.iter().filter(|r| !r.is_empty()).collect();
    ranked.sort_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then(a.recognizer_order.cmp(&b.recognizer_order))
            .then(b.len().cmp(&a.len()))
            .then(a.start.cmp(&b.start))
            .then_with(|| a.entity_type.cmp(&b.entity_type))
    });

    let mut chosen: Vec<&ResolvedResult> = Vec::with_capacity(ranked.len());
    for r in ranked {
        if chosen.iter().all(|c| !c.overlaps(r)) {
            chosen.push(r);
        }
    }
    chosen
}

/// Rewrites `text` with every selected result masked. Returns the new text and
/// the masked regions in ascending order.
pub fn anonymize(text: &str, results: &[ResolvedResult], filler: char) -> (String, Vec<MaskedSpan>) {
    let mut chosen = select_for_masking(results);
    chosen.sort_by(|a, b| b.start.cmp(&a.start));

    let mapper = CharIndexMapper::new(text);
    let mut out = text.to_string();
    let mut masked_spans = Vec::with_capacity(chosen.len());

    for r in chosen {
        let (start, end) = (mapper.to_byte(r.start), mapper.to_byte(r.end));
        if start >= end {
            continue;
        }
        let original = &text[start..end];
        let masked = mask_value(&r.entity_type, original, filler);
        log_mask_action_debug("cnshield_core::anonymizer", &r.entity_type, original, &masked);
        out.replace_range(start..end, &masked);
        masked_spans.push(MaskedSpan {
            entity_type: r.entity_type.clone(),
            start: r.start,
            end: r.end,
            masked,
        });
    }

    masked_spans.reverse();
    (out, masked_spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::test_span;

    fn result(entity_type: EntityType, start: usize, end: usize, score: f64, order: usize) -> ResolvedResult {
        let mut r = test_span(entity_type, start, end, score).into_result();
        r.recognizer_order = order;
        r
    }

    #[test]
    fn test_mask_table() {
        assert_eq!(mask_value(&EntityType::Phone, "13812345678", '*'), "138****5678");
        assert_eq!(mask_value(&EntityType::Phone, "138-1234-5678", '*'), "138-****-5678");
        assert_eq!(mask_value(&EntityType::Phone, "+86 13812345678", '*'), "+86 138****5678");
        assert_eq!(mask_value(&EntityType::IdCard, "110101199003074514", '*'), "1101**********4514");
        assert_eq!(mask_value(&EntityType::IdCard, "110101900307451", '*'), "1101*******7451");
        assert_eq!(mask_value(&EntityType::BankCard, "6222021234567890123", '*'), "6222 **** **** 0123");
        assert_eq!(mask_value(&EntityType::BankCard, "6222021234", '*'), "6222****1234");
        assert_eq!(mask_value(&EntityType::Email, "zhangsan@qq.com", '*'), "zha***@qq.com");
        assert_eq!(mask_value(&EntityType::Email, "li@163.com", '*'), "l***@163.com");
        assert_eq!(mask_value(&EntityType::Person, "张三丰", '*'), "张**");
        assert_eq!(mask_value(&EntityType::Person, "欧阳娜娜", '*'), "欧阳**");
        assert_eq!(mask_value(&EntityType::Passport, "E12345678", '*'), "E1*****78");
        assert_eq!(mask_value(&EntityType::VehiclePlate, "京A12345", '#'), "京A####5");
        assert_eq!(mask_value(&EntityType::Location, "北京市海淀区中关村大街27号", '*'), "北京市海淀区********");
        assert_eq!(mask_value(&EntityType::Location, "上海市", '*'), "上**");
        assert_eq!(mask_value(&EntityType::Jwt, "eyJ.x.y", '*'), "*******");
    }

    #[test]
    fn test_country_code_is_not_counted_as_the_number() {
        assert_eq!(mask_value(&EntityType::Phone, "+8613812345678", '*'), "+86138****5678");
        assert_eq!(mask_value(&EntityType::Phone, "0086 13812345678", '*'), "0086 138****5678");
        assert_eq!(mask_value(&EntityType::Phone, "+86-138-1234-5678", '*'), "+86-138-****-5678");
        assert_eq!(mask_value(&EntityType::Phone, "008613812345678", '#'), "0086138####5678");
        // A bare 11-digit number that happens to start with 86 is not a prefix.
        assert_eq!(mask_value(&EntityType::Phone, "86123456789", '*'), "861****6789");
    }

    #[test]
    fn test_length_preserved_for_non_changing_types() {
        let samples = [
            (EntityType::Phone, "010-12345678"),
            (EntityType::IdCard, "11010119900307451X"),
            (EntityType::Person, "司马懿"),
            (EntityType::MilitaryId, "军字第1234567号"),
            (EntityType::VehiclePlate, "粤B"),
            (EntityType::IpAddress, "192.168.1.1"),
            (EntityType::Custom("WORK_ID".into()), "GZ-123456"),
        ];
        for (entity_type, value) in samples {
            assert!(!is_length_changing(&entity_type));
            let masked = mask_value(&entity_type, value, '*');
            assert_eq!(masked.chars().count(), value.chars().count(), "{entity_type}: {masked}");
        }
    }

    #[test]
    fn test_anonymize_right_to_left() {
        let text = "电话13812345678，邮箱zhangsan@qq.com";
        let results = vec![
            result(EntityType::Phone, 2, 13, 0.9, 1),
            result(EntityType::Email, 16, 31, 0.9, 3),
        ];
        let (out, spans) = anonymize(text, &results, '*');
        assert_eq!(out, "电话138****5678，邮箱zha***@qq.com");
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].entity_type, EntityType::Phone);
        assert_eq!(spans[1].masked, "zha***@qq.com");
    }

    #[test]
    fn test_cross_type_overlap_masks_only_the_winner() {
        let text = "地址北京市朝阳区13812345678号";
        let results = vec![
            result(EntityType::Location, 2, 20, 0.8, 20),
            result(EntityType::Phone, 8, 19, 0.9, 1),
        ];
        let (out, spans) = anonymize(text, &results, '*');
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].entity_type, EntityType::Phone);
        assert_eq!(out, "地址北京市朝阳区138****5678号");

        // Equal scores: the earlier registered recognizer wins.
        let results = vec![
            result(EntityType::Location, 2, 20, 0.9, 20),
            result(EntityType::Phone, 8, 19, 0.9, 1),
        ];
        let (_, spans) = anonymize(text, &results, '*');
        assert_eq!(spans[0].entity_type, EntityType::Phone);
    }

    #[test]
    fn test_empty_results_leave_text_alone() {
        let (out, spans) = anonymize("没有敏感信息", &[], '*');
        assert_eq!(out, "没有敏感信息");
        assert!(spans.is_empty());
    }
}
