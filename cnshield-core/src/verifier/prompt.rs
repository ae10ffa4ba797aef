// cnshield-core/src/verifier/prompt.rs
//! Verification prompt construction and verdict parsing.
//!
//! License: MIT OR APACHE 2.0

use anyhow::{anyhow, Context, Result};
use cnshield_context::window;
use serde_json::Value;
use tinytemplate::TinyTemplate;

use crate::entity::EntityType;
use crate::verifier::{Verdict, VerificationRequest};

/// Marks where the window was cut short of the text.
const ELLIPSIS: &str = "...";

pub const SYSTEM_PROMPT: &str = "你是数据安全审核员，只输出 JSON。";

const PROMPT_TEMPLATE: &str = "请判断下面被【】标出的片段是否确实是个人敏感信息。

上下文：{context}
待判断片段：{text}
识别类型：{entity_type}（{description}）
识别分数：{score}

判断时请考虑：
1. 片段是否指向真实的个人、账户或凭据，而不是示例、占位符、产品名或代码标识符。
2. 片段的格式是否符合识别类型。
3. 上下文语义是否支持这一判断。

只输出一个 JSON 对象，不要附加其他文字，格式如下：
{example}
";

const RESPONSE_EXAMPLE: &str = r#"{"is_sensitive": true, "confidence": 0.9, "reason": "简短理由"}"#;

/// Human-readable description of an entity type for the prompt.
pub fn describe(entity_type: &EntityType) -> &'static str {
    match entity_type {
        EntityType::IdCard => "中国居民身份证号码",
        EntityType::Phone => "手机号或固定电话号码",
        EntityType::BankCard => "银行卡号",
        EntityType::Email => "电子邮箱地址",
        EntityType::Passport => "护照或港澳台通行证号码",
        EntityType::SocialCreditCode => "统一社会信用代码",
        EntityType::VehiclePlate => "机动车号牌",
        EntityType::IpAddress => "IP 地址",
        EntityType::PostalCode => "邮政编码",
        EntityType::DriverLicense => "驾驶证号码",
        EntityType::MilitaryId => "军官证或士兵证号码",
        EntityType::MedicalLicense => "医师执业证或医疗机构许可证号码",
        EntityType::MacAddress => "网卡 MAC 地址",
        EntityType::JdbcConnection => "数据库连接串",
        EntityType::Jwt => "JWT 令牌",
        EntityType::CloudKey => "云服务访问密钥",
        EntityType::WechatId => "微信 OpenID、AppID 或企业微信 CorpID",
        EntityType::SensitiveField => "密码、密钥等敏感字段取值",
        EntityType::Person => "人名",
        EntityType::Location => "地址或地名",
        EntityType::Organization => "机构或公司名称",
        EntityType::DateTime => "日期或时间",
        EntityType::Custom(_) => "自定义敏感信息",
    }
}

/// The entity with up to `window_chars` chars on each side, the entity set off
/// by `【】`. `start`/`end` are byte offsets into `text`.
pub fn build_context(text: &str, start: usize, end: usize, window_chars: usize) -> String {
    let before = window::before(text, start, window_chars);
    let after = window::after(text, end, window_chars);
    let entity = text.get(start..end).unwrap_or_default();

    let before_start = start.min(text.len()) - before.len();
    let after_end = end.min(text.len()) + after.len();

    let mut out = String::with_capacity(before.len() + entity.len() + after.len() + 16);
    if before_start > 0 {
        out.push_str(ELLIPSIS);
    }
    out.push_str(before);
    out.push('【');
    out.push_str(entity);
    out.push('】');
    out.push_str(after);
    if after_end < text.len() {
        out.push_str(ELLIPSIS);
    }
    out
}

pub fn render_prompt(request: &VerificationRequest) -> Result<String> {
    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&tinytemplate::format_unescaped);
    tt.add_template("verify", PROMPT_TEMPLATE)
        .context("Failed to parse verification prompt template")?;

    tt.render(
        "verify",
        &serde_json::json!({
            "context": request.context,
            "text": request.text,
            "entity_type": request.entity_type.as_str(),
            "description": describe(&request.entity_type),
            "score": format!("{:.2}", request.score),
            "example": RESPONSE_EXAMPLE,
        }),
    )
    .map_err(|e| anyhow!("Failed to render verification prompt: {}", e))
}

fn strip_code_fences(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "是" => Some(true),
            "false" | "no" | "否" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Parses a backend reply into a verdict. The reply must contain a JSON
/// object with a boolean `is_sensitive`; anything else is an error.
pub fn parse_verdict(response: &str) -> Result<Verdict> {
    let body = strip_code_fences(response);
    let start = body
        .find('{')
        .ok_or_else(|| anyhow!("No JSON object in verifier response"))?;

    let object: Value = serde_json::Deserializer::from_str(&body[start..])
        .into_iter::<Value>()
        .next()
        .ok_or_else(|| anyhow!("Empty verifier response"))?
        .context("Verifier response is not valid JSON")?;

    let confirmed = object
        .get("is_sensitive")
        .and_then(as_bool)
        .ok_or_else(|| anyhow!("Verifier response lacks a boolean 'is_sensitive'"))?;
    let confidence = object
        .get("confidence")
        .and_then(Value::as_f64)
        .map(|c| c.clamp(0.0, 1.0));
    let reason = object
        .get("reason")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(String::from);

    Ok(Verdict { confirmed, confidence, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_marks_entity_and_truncation() {
        let text = "客户张三的手机号是13812345678，请尽快回电确认订单信息";
        let start = text.find("138").unwrap();
        let end = start + 11;
        let ctx = build_context(text, start, end, 4);
        assert_eq!(ctx, "...手机号是【13812345678】，请尽快...");

        let ctx = build_context(text, start, end, 100);
        assert_eq!(ctx, "客户张三的手机号是【13812345678】，请尽快回电确认订单信息");
    }

    #[test]
    fn test_prompt_carries_request_fields() {
        let request = VerificationRequest {
            entity_type: EntityType::Phone,
            text: "13812345678".into(),
            context: "电话【13812345678】".into(),
            score: 0.6,
        };
        let prompt = render_prompt(&request).unwrap();
        assert!(prompt.contains("电话【13812345678】"));
        assert!(prompt.contains("PHONE（手机号或固定电话号码）"));
        assert!(prompt.contains("0.60"));
        assert!(prompt.contains(r#""is_sensitive""#));
    }

    #[test]
    fn test_parse_plain_and_fenced() {
        let v = parse_verdict(r#"{"is_sensitive": true, "confidence": 0.92, "reason": "真实手机号"}"#).unwrap();
        assert!(v.confirmed);
        assert_eq!(v.confidence, Some(0.92));
        assert_eq!(v.reason.as_deref(), Some("真实手机号"));

        let fenced = "```json\n{\"is_sensitive\": \"false\", \"reason\": \"示例号码\"}\n```";
        let v = parse_verdict(fenced).unwrap();
        assert!(!v.confirmed);
        assert_eq!(v.confidence, None);
    }

    #[test]
    fn test_parse_takes_first_object_after_prose() {
        let reply = "判断如下：{\"is_sensitive\": false, \"confidence\": 3} 以上。{\"is_sensitive\": true}";
        let v = parse_verdict(reply).unwrap();
        assert!(!v.confirmed);
        assert_eq!(v.confidence, Some(1.0));
    }

    #[test]
    fn test_unparsable_replies_are_errors() {
        assert!(parse_verdict("I think it is sensitive.").is_err());
        assert!(parse_verdict("{\"confidence\": 0.5}").is_err());
        assert!(parse_verdict("{\"is_sensitive\": maybe}").is_err());
    }
}
