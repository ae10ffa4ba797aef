// cnshield-context/src/heuristics/mod.rs
//! Heuristic tables for names, places and organisations.
//!
//! These drive the statistical recognizer's score modifiers and the person-name
//! mask (compound surnames keep two characters).

use crate::scoring::clamp_score;

/// Which statistical heuristic applies to a span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Person,
    Location,
    Organization,
    Other,
}

pub const COMMON_SURNAMES: &str = "王李张刘陈杨黄赵周吴徐孙马朱胡郭何高林罗郑梁谢宋唐许韩冯邓曹彭曾萧田董潘袁蔡蒋余于杜叶程魏苏吕丁任沈姚卢姜崔钟谭陆汪范金石廖贾夏韦傅方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵万钱严覃武戴莫孔向汤";

pub const COMPOUND_SURNAMES: &[&str] = &[
    "欧阳", "司马", "诸葛", "上官", "东方", "皇甫", "尉迟", "公孙", "慕容", "长孙",
    "宇文", "司徒", "夏侯", "轩辕", "令狐", "端木", "独孤", "南宫", "西门", "百里",
];

pub const ADMIN_SUFFIXES: &[&str] = &[
    "省", "市", "区", "县", "镇", "乡", "村", "街道", "路", "道", "巷", "弄", "号", "楼", "室",
];

pub const ORG_SUFFIXES: &[&str] = &[
    "公司", "集团", "银行", "医院", "学校", "大学", "学院", "研究所", "研究院", "中心",
    "局", "部", "厅", "委", "会", "协会", "基金会",
];

pub const PERSON_CONTEXT: &[&str] = &[
    "姓名", "名字", "本人", "用户", "客户", "员工", "先生", "女士", "联系人", "负责人",
    "经办人", "申请人", "持卡人", "收件人", "发件人", "法人", "代表", "签名", "签字",
    "户主", "业主", "房主",
];

pub const LOCATION_CONTEXT: &[&str] = &[
    "地址", "住址", "居住地", "户籍", "籍贯", "所在地", "位置", "街道", "小区", "单元",
    "门牌", "邮寄地址", "收货地址", "公司地址", "家庭地址", "工作地址", "通讯地址",
];

pub const ORGANIZATION_CONTEXT: &[&str] = &[
    "公司", "企业", "单位", "机构", "组织", "部门", "集团", "有限公司", "股份公司",
    "责任公司", "合伙企业", "银行", "医院", "学校", "大学", "学院", "研究所", "研究院",
    "工作单位", "就职单位", "所属单位", "开户行", "发卡行",
];

pub const DATE_TIME_CONTEXT: &[&str] = &[
    "日期", "时间", "出生日期", "生日", "出生年月", "入职日期", "有效期", "到期日",
    "签发日期", "注册日期", "创建时间",
];

/// Modifier weights for the statistical path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeuristicWeights {
    pub context_bonus: f64,
    pub shape_bonus: f64,
    pub short_penalty: f64,
}

impl Default for HeuristicWeights {
    fn default() -> Self {
        Self {
            context_bonus: 0.1,
            shape_bonus: 0.1,
            short_penalty: 0.5,
        }
    }
}

pub fn starts_with_common_surname(text: &str) -> bool {
    text.chars().next().is_some_and(|c| COMMON_SURNAMES.contains(c))
}

/// Number of leading chars that form the surname: 2 for a known compound
/// surname, 1 otherwise (0 for empty text).
pub fn surname_len(text: &str) -> usize {
    if COMPOUND_SURNAMES.iter().any(|s| text.starts_with(s)) {
        2
    } else {
        usize::from(!text.is_empty())
    }
}

pub fn ends_with_any(text: &str, suffixes: &[&str]) -> bool {
    suffixes.iter().any(|s| text.ends_with(s))
}

/// Whether a span is too short (or, for names, too long) to be good evidence.
pub fn is_weak_shape(kind: SpanKind, text: &str) -> bool {
    let len = text.chars().count();
    match kind {
        SpanKind::Person => !(2..=6).contains(&len),
        SpanKind::Location => len < 2,
        SpanKind::Organization => len < 3,
        SpanKind::Other => false,
    }
}

/// Scores a statistical span: additive bonuses first, then the short-span
/// penalty, then clamping into `[0, 1]`.
pub fn statistical_score(
    base: f64,
    kind: SpanKind,
    text: &str,
    has_context: bool,
    weights: &HeuristicWeights,
) -> f64 {
    let mut score = base;
    if has_context {
        score += weights.context_bonus;
    }

    let shape_hit = match kind {
        SpanKind::Person => starts_with_common_surname(text),
        SpanKind::Location => ends_with_any(text, ADMIN_SUFFIXES),
        SpanKind::Organization => ends_with_any(text, ORG_SUFFIXES),
        SpanKind::Other => false,
    };
    if shape_hit {
        score += weights.shape_bonus;
    }

    if is_weak_shape(kind, text) {
        score *= weights.short_penalty;
    }
    clamp_score(score)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_person_with_surname_and_context() {
        let w = HeuristicWeights::default();
        assert_eq!(statistical_score(0.85, SpanKind::Person, "张三", true, &w), 1.0);
        assert_eq!(statistical_score(0.85, SpanKind::Person, "张三", false, &w), 0.95);
        assert_eq!(statistical_score(0.85, SpanKind::Person, "Alice", false, &w), 0.85);
    }

    #[test]
    fn test_short_spans_are_penalised() {
        let w = HeuristicWeights::default();
        assert_eq!(statistical_score(0.85, SpanKind::Person, "张", false, &w), 0.475);
        assert_eq!(statistical_score(0.85, SpanKind::Organization, "某司", false, &w), 0.425);
        assert_eq!(statistical_score(0.85, SpanKind::Location, "京", false, &w), 0.425);
    }

    #[test]
    fn test_suffix_bonus() {
        let w = HeuristicWeights::default();
        assert_eq!(statistical_score(0.85, SpanKind::Location, "朝阳区", false, &w), 0.95);
        assert_eq!(statistical_score(0.85, SpanKind::Organization, "腾讯公司", false, &w), 0.95);
    }

    #[test]
    fn test_compound_surname_len() {
        assert_eq!(surname_len("欧阳修"), 2);
        assert_eq!(surname_len("张三"), 1);
        assert_eq!(surname_len(""), 0);
    }
}
