// File: cnshield-core/src/validators.rs
//! Programmatic validation functions for specific sensitive data types.
//!
//! Regex patterns only describe the *shape* of an identifier. The functions in
//! this module apply the structural rules that the shape cannot express:
//! weighted checksums (national ID, unified social credit code), the Luhn check
//! (bank cards), carrier prefix tables (mobile numbers) and so on.
//!
//! Every validator is total. It returns a [`Validation`] verdict and never
//! panics on arbitrary input; anything it cannot parse is simply `Invalid`.
//! A separate blacklist check rejects values that are well-formed but obviously
//! fake (all-same digits, sequential runs, reserved prefixes).
//!
//! License: MIT OR APACHE 2.0

use std::collections::HashSet;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// Outcome of a structural check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validation {
    /// The structure is confirmed (checksum passes, known prefix, ...).
    Valid,
    /// The value cannot be a real instance of the type.
    Invalid,
    /// Well-formed, but the structure alone cannot confirm it.
    Inconclusive,
}

/// The named validators a rule may attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidatorKind {
    IdCard,
    Phone,
    BankCard,
    Email,
    Passport,
    SocialCreditCode,
    VehiclePlate,
    IpAddress,
    PostalCode,
    DriverLicense,
    MilitaryId,
    MedicalLicense,
    MacAddress,
    Jdbc,
    Jwt,
    CloudKey,
    Wechat,
    SensitiveField,
}

impl ValidatorKind {
    /// Runs the structural check for this kind.
    pub fn validate(&self, text: &str) -> Validation {
        match self {
            ValidatorKind::IdCard => validate_id_card(text),
            ValidatorKind::Phone => validate_phone(text),
            ValidatorKind::BankCard => validate_bank_card(text),
            ValidatorKind::Email => validate_email(text),
            ValidatorKind::Passport => validate_passport(text),
            ValidatorKind::SocialCreditCode => validate_social_credit_code(text),
            ValidatorKind::VehiclePlate => validate_vehicle_plate(text),
            ValidatorKind::IpAddress => validate_ip_address(text),
            ValidatorKind::PostalCode => validate_postal_code(text),
            ValidatorKind::DriverLicense => validate_driver_license(text),
            ValidatorKind::MilitaryId => validate_military_id(text),
            ValidatorKind::MedicalLicense => validate_medical_license(text),
            ValidatorKind::MacAddress => validate_mac_address(text),
            ValidatorKind::Jdbc => validate_jdbc(text),
            ValidatorKind::Jwt => validate_jwt(text),
            ValidatorKind::CloudKey => validate_cloud_key(text),
            ValidatorKind::Wechat => validate_wechat(text),
            ValidatorKind::SensitiveField => validate_sensitive_field(text),
        }
    }

    /// Whether the value is an obvious fake that should be dropped outright.
    pub fn is_blacklisted(&self, text: &str) -> bool {
        match self {
            ValidatorKind::IdCard => id_card_blacklisted(text),
            ValidatorKind::Phone => phone_blacklisted(text),
            ValidatorKind::BankCard => bank_card_blacklisted(text),
            ValidatorKind::Email => email_blacklisted(text),
            ValidatorKind::Passport => passport_blacklisted(text),
            ValidatorKind::SocialCreditCode => all_same(&strip_separators(text, &['-', ' '])),
            ValidatorKind::VehiclePlate => vehicle_plate_blacklisted(text),
            ValidatorKind::IpAddress => ip_address_blacklisted(text),
            ValidatorKind::PostalCode => postal_code_blacklisted(text),
            ValidatorKind::DriverLicense => all_same(&digits_of(text)),
            ValidatorKind::MilitaryId | ValidatorKind::MedicalLicense => {
                let digits = digits_of(text);
                digits.len() > 3 && all_same(&digits)
            }
            ValidatorKind::MacAddress => mac_address_blacklisted(text),
            ValidatorKind::Jdbc => text.trim().chars().count() < 15,
            ValidatorKind::Jwt => {
                let token = text.trim();
                token.len() < 30 || !token.starts_with("eyJ")
            }
            ValidatorKind::CloudKey => cloud_key_blacklisted(text),
            ValidatorKind::Wechat => distinct_chars(text.trim()) <= 2,
            ValidatorKind::SensitiveField => sensitive_field_blacklisted(text),
        }
    }
}

// ---- shared helpers ----

fn digits_of(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn strip_separators(text: &str, separators: &[char]) -> String {
    text.trim().chars().filter(|c| !separators.contains(c)).collect()
}

fn all_same(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => chars.all(|c| c == first),
        None => false,
    }
}

fn distinct_chars(s: &str) -> usize {
    s.chars().collect::<HashSet<_>>().len()
}

/// Whether the digits form an ascending or descending run (mod 10), e.g.
/// `12345678901` or `10987654321`.
fn is_sequential(digits: &str) -> bool {
    let values: Vec<u32> = digits.chars().filter_map(|c| c.to_digit(10)).collect();
    if values.len() < 6 || values.len() != digits.chars().count() {
        return false;
    }
    let ascending = values.windows(2).all(|w| w[1] == (w[0] + 1) % 10);
    let descending = values.windows(2).all(|w| w[0] == (w[1] + 1) % 10);
    ascending || descending
}

// ---- national ID ----

const ID_WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];
const ID_CHECK_CHARS: [char; 11] = ['1', '0', 'X', '9', '8', '7', '6', '5', '4', '3', '2'];

static ID_PROVINCE_CODES: Lazy<HashSet<u32>> = Lazy::new(|| {
    let mut set = HashSet::new();
    for range in [11..=15, 21..=23, 31..=37, 41..=46, 50..=54, 61..=65] {
        set.extend(range);
    }
    set.extend([71, 81, 82]);
    set
});

/// Computes the expected check character of an 18-char ID from its first 17
/// digits. Returns `None` if any of them is not a digit.
pub fn id_card_check_char(first17: &str) -> Option<char> {
    if first17.len() != 17 {
        return None;
    }
    let mut sum = 0;
    for (c, weight) in first17.chars().zip(ID_WEIGHTS) {
        sum += c.to_digit(10)? * weight;
    }
    Some(ID_CHECK_CHARS[(sum % 11) as usize])
}

fn id_checksum_matches(id: &str) -> bool {
    if id.len() != 18 || !id.is_ascii() {
        return false;
    }
    match id_card_check_char(&id[..17]) {
        Some(expected) => id[17..].chars().next().map(|c| c.to_ascii_uppercase()) == Some(expected),
        None => false,
    }
}

/// Validates an 18-char resident ID: weighted mod-11 checksum first, then the
/// province prefix (an unknown prefix is only inconclusive).
pub fn validate_id_card(text: &str) -> Validation {
    let id = strip_separators(text, &['-', ' ']).to_ascii_uppercase();
    if id.len() == 15 && id.chars().all(|c| c.is_ascii_digit()) {
        return Validation::Inconclusive;
    }
    if !id_checksum_matches(&id) {
        return Validation::Invalid;
    }
    let province: u32 = id[..2].parse().unwrap_or(0);
    if ID_PROVINCE_CODES.contains(&province) {
        Validation::Valid
    } else {
        Validation::Inconclusive
    }
}

fn id_card_blacklisted(text: &str) -> bool {
    let id = strip_separators(text, &['-', ' ']).to_ascii_uppercase();
    if id.len() != 18 || !id.is_ascii() {
        return false;
    }
    let first17 = &id[..17];
    if all_same(first17) || is_sequential(first17) {
        return true;
    }
    !is_plausible_birth_date(&id[6..14])
}

fn is_plausible_birth_date(yyyymmdd: &str) -> bool {
    if yyyymmdd.len() != 8 {
        return false;
    }
    let (Ok(year), Ok(month), Ok(day)) = (
        yyyymmdd[..4].parse::<i32>(),
        yyyymmdd[4..6].parse::<u32>(),
        yyyymmdd[6..].parse::<u32>(),
    ) else {
        return false;
    };
    (1900..=2100).contains(&year) && NaiveDate::from_ymd_opt(year, month, day).is_some()
}

// ---- phone ----

static VALID_MOBILE_PREFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    let mut set = HashSet::new();
    // China Mobile
    set.extend([
        "134", "135", "136", "137", "138", "139", "147", "148", "150", "151", "152", "157",
        "158", "159", "172", "178", "182", "183", "184", "187", "188", "195", "197", "198",
    ]);
    // China Unicom
    set.extend([
        "130", "131", "132", "145", "146", "155", "156", "166", "167", "171", "175", "176",
        "185", "186", "196",
    ]);
    // China Telecom
    set.extend([
        "133", "149", "153", "173", "174", "177", "180", "181", "189", "190", "191", "193",
        "199",
    ]);
    // China Broadnet and virtual operators
    set.extend(["192", "162", "165", "170"]);
    set
});

/// Digits of a phone number with the `+86` / `0086` country code removed.
fn phone_digits(text: &str) -> String {
    let trimmed = text.trim();
    let digits = digits_of(trimmed);
    if trimmed.starts_with('+') {
        digits.strip_prefix("86").map(str::to_string).unwrap_or(digits)
    } else if trimmed.starts_with("0086") {
        digits[4..].to_string()
    } else {
        digits
    }
}

/// Validates mobile, landline and 400/800 service numbers.
pub fn validate_phone(text: &str) -> Validation {
    let digits = phone_digits(text);
    let len = digits.len();

    if len == 11 && digits.starts_with('1') {
        if VALID_MOBILE_PREFIXES.contains(&digits[..3]) {
            return Validation::Valid;
        }
        return match digits.as_bytes()[1] {
            b'3'..=b'9' => Validation::Inconclusive,
            _ => Validation::Invalid,
        };
    }
    if len == 10 && (digits.starts_with("400") || digits.starts_with("800")) {
        return Validation::Valid;
    }
    if digits.starts_with('0') {
        if len == 11 && (digits.starts_with("010") || digits.starts_with("02")) {
            return Validation::Valid;
        }
        if (11..=12).contains(&len) && digits.as_bytes()[1] != b'0' {
            return Validation::Valid;
        }
        if (10..=12).contains(&len) {
            return Validation::Inconclusive;
        }
    }
    Validation::Invalid
}

fn phone_blacklisted(text: &str) -> bool {
    let digits = phone_digits(text);
    if all_same(&digits) || is_sequential(&digits) {
        return true;
    }
    digits.len() == 11 && ["100", "110", "120"].iter().any(|p| digits.starts_with(p))
}

// ---- bank card ----

/// Validates a number using the Luhn algorithm.
///
/// The Luhn algorithm, also known as the Mod 10 algorithm, is a simple checksum
/// formula used to validate a variety of identification numbers, such as
/// credit card numbers.
///
/// # Arguments
///
/// * `num_str` - A string slice containing only digits.
///
/// # Returns
///
/// `true` if the number is valid according to the Luhn algorithm, `false` otherwise.
pub fn is_valid_luhn(num_str: &str) -> bool {
    let mut sum = 0;
    let mut alternate = false;

    for c in num_str.chars().rev() {
        let Some(mut digit) = c.to_digit(10) else { return false; };

        if alternate {
            digit *= 2;
            if digit > 9 {
                digit -= 9;
            }
        }
        sum += digit;
        alternate = !alternate;
    }

    sum % 10 == 0
}

/// Validates a bank card number: 15 to 19 digits and a passing Luhn check.
pub fn validate_bank_card(text: &str) -> Validation {
    let digits = strip_separators(text, &['-', ' ']);
    if !(15..=19).contains(&digits.len()) || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Validation::Invalid;
    }
    if is_valid_luhn(&digits) {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

fn bank_card_blacklisted(text: &str) -> bool {
    let digits = digits_of(text);
    all_same(&digits)
        || is_sequential(&digits)
        || ["0000", "1111", "9999", "0123"].iter().any(|p| digits.starts_with(p))
}

// ---- email ----

const KNOWN_EMAIL_PROVIDERS: &[&str] = &[
    "qq.com", "163.com", "126.com", "sina.com", "sina.cn", "aliyun.com", "alibaba.com",
    "taobao.com", "tencent.com", "sohu.com", "foxmail.com", "139.com", "189.cn",
    "gmail.com", "outlook.com", "hotmail.com", "yahoo.com", "icloud.com",
];

const INVALID_EMAIL_EXTENSIONS: &[&str] = &[
    ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".svg", ".tiff", ".ico", ".heic",
    ".heif", ".mp3", ".mp4", ".avi", ".mov", ".wmv", ".pdf", ".doc", ".docx", ".xls", ".xlsx",
];

pub fn validate_email(text: &str) -> Validation {
    let email = text.trim().to_lowercase();
    let Some((local, domain)) = email.rsplit_once('@') else {
        return Validation::Invalid;
    };
    if local.is_empty() || !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Validation::Invalid;
    }
    let known = KNOWN_EMAIL_PROVIDERS
        .iter()
        .any(|p| domain == *p || domain.ends_with(&format!(".{}", p)));
    if known {
        Validation::Valid
    } else {
        Validation::Inconclusive
    }
}

fn email_blacklisted(text: &str) -> bool {
    let email = text.trim().to_lowercase();
    INVALID_EMAIL_EXTENSIONS.iter().any(|ext| email.ends_with(ext))
        || email.matches('.').count() > 4
        || ["test@test", "example@example", "xxx@xxx"].iter().any(|f| email.contains(f))
}

// ---- passport and travel permits ----

pub fn validate_passport(text: &str) -> Validation {
    let passport = strip_separators(text, &['-', ' ']).to_ascii_uppercase();
    if !(8..=9).contains(&passport.len()) || !passport.is_ascii() {
        return Validation::Invalid;
    }
    match passport.chars().next() {
        Some('E' | 'D' | 'S' | 'P' | 'G' | 'C' | 'W' | 'L' | 'T') => Validation::Valid,
        // Old all-numeric booklets look like any other number.
        _ => Validation::Inconclusive,
    }
}

fn passport_blacklisted(text: &str) -> bool {
    let digits = digits_of(text);
    (digits.len() > 5 && all_same(&digits))
        || ["00000000", "11111111", "99999999"].contains(&digits.as_str())
}

// ---- unified social credit code ----

const USCC_ALPHABET: &str = "0123456789ABCDEFGHJKLMNPQRTUWXY";
const USCC_WEIGHTS: [u32; 17] = [1, 3, 9, 27, 19, 26, 16, 17, 20, 29, 25, 13, 8, 24, 10, 30, 28];

/// Validates an 18-char unified social credit code with its mod-31 check char.
pub fn validate_social_credit_code(text: &str) -> Validation {
    let code = strip_separators(text, &['-', ' ']).to_ascii_uppercase();
    if code.len() != 18 || !code.is_ascii() {
        return Validation::Invalid;
    }
    let mut values = Vec::with_capacity(18);
    for c in code.chars() {
        match USCC_ALPHABET.find(c) {
            Some(v) => values.push(v as u32),
            None => return Validation::Invalid,
        }
    }
    let sum: u32 = values[..17].iter().zip(USCC_WEIGHTS).map(|(v, w)| v * w).sum();
    let expected = (31 - sum % 31) % 31;
    if values[17] == expected {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

// ---- vehicle plate ----

pub const PLATE_PROVINCES: &str = "京津沪渝冀豫云辽黑湘皖鲁新苏浙赣鄂桂甘晋蒙陕吉闽贵粤青藏川宁琼";
const PLATE_SPECIAL_PREFIXES: &str = "军空海北沈兰济南广成使";

fn normalized_plate(text: &str) -> Vec<char> {
    strip_separators(text, &['·', '-', ' ']).chars().collect()
}

pub fn validate_vehicle_plate(text: &str) -> Validation {
    let plate = normalized_plate(text);
    let Some(&first) = plate.first() else {
        return Validation::Invalid;
    };
    let min_len = if first == '使' { 6 } else { 7 };
    if plate.len() < min_len || plate.len() > 8 {
        return Validation::Invalid;
    }
    if PLATE_PROVINCES.contains(first) || PLATE_SPECIAL_PREFIXES.contains(first) {
        Validation::Valid
    } else {
        Validation::Inconclusive
    }
}

fn vehicle_plate_blacklisted(text: &str) -> bool {
    let plate = normalized_plate(text);
    if plate.len() <= 2 {
        return false;
    }
    let suffix: String = plate[2..].iter().collect();
    all_same(&suffix)
        || ["00000", "11111", "99999", "000000", "111111", "999999"].contains(&suffix.as_str())
}

// ---- IP address ----

fn ipv4_octets(text: &str) -> Option<[u8; 4]> {
    let host = text.trim().split(':').next()?;
    let mut octets = [0u8; 4];
    let mut parts = host.split('.');
    for octet in octets.iter_mut() {
        *octet = parts.next()?.parse().ok()?;
    }
    if parts.next().is_some() {
        return None;
    }
    Some(octets)
}

/// Private and loopback IPv4 ranges are confirmed; public addresses (which may
/// be version numbers) and IPv6 forms stay inconclusive.
pub fn validate_ip_address(text: &str) -> Validation {
    if let Some([a, b, _, _]) = ipv4_octets(text) {
        let private = a == 10 || a == 127 || (a == 172 && (16..=31).contains(&b)) || (a == 192 && b == 168);
        return if private { Validation::Valid } else { Validation::Inconclusive };
    }
    if text.trim().parse::<std::net::Ipv6Addr>().is_ok() {
        return Validation::Inconclusive;
    }
    Validation::Invalid
}

fn ip_address_blacklisted(text: &str) -> bool {
    matches!(ipv4_octets(text), Some([_, 0, 0, 0]))
}

// ---- postal code ----

static POSTAL_PREFIXES: Lazy<HashSet<u32>> = Lazy::new(|| {
    let mut set = HashSet::new();
    for range in [1..=16, 20..=27, 30..=37, 40..=47, 50..=56, 60..=67, 70..=79, 80..=82] {
        set.extend(range);
    }
    set
});

/// Six-digit codes with a known province prefix. Never `Valid`: a bare
/// six-digit number needs context to count as a postal code.
pub fn validate_postal_code(text: &str) -> Validation {
    let code = strip_separators(text, &['-', ' ']);
    if code.len() != 6 || !code.chars().all(|c| c.is_ascii_digit()) {
        return Validation::Invalid;
    }
    let prefix: u32 = code[..2].parse().unwrap_or(0);
    if POSTAL_PREFIXES.contains(&prefix) {
        Validation::Inconclusive
    } else {
        Validation::Invalid
    }
}

fn postal_code_blacklisted(text: &str) -> bool {
    let code = strip_separators(text, &['-', ' ']);
    all_same(&code)
        || ["123456", "654321"].contains(&code.as_str())
        || code.starts_with("00")
        || code.starts_with("99")
}

// ---- driver license ----

/// 18-digit licence numbers are the holder's resident ID number, so a
/// passing ID checksum only proves the shape: the value stays inconclusive
/// and context words decide whether it is reported as a licence. 15-digit and
/// 12-digit archive numbers carry no check digit.
pub fn validate_driver_license(text: &str) -> Validation {
    let license = strip_separators(text, &['-', ' ']).to_ascii_uppercase();
    match license.len() {
        18 if id_checksum_matches(&license) => Validation::Inconclusive,
        15 | 12 if license.chars().all(|c| c.is_ascii_digit()) => Validation::Inconclusive,
        _ => Validation::Invalid,
    }
}

// ---- military and medical ----

pub fn validate_military_id(text: &str) -> Validation {
    let count = digits_of(text).len();
    if (6..=18).contains(&count) {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

/// Prefixed certificate numbers are confirmed by their label; bare numbers
/// of the right size stay inconclusive.
pub fn validate_medical_license(text: &str) -> Validation {
    let count = digits_of(text).len();
    if !(10..=18).contains(&count) {
        return Validation::Invalid;
    }
    let labelled = ["医师", "护士", "药师", "资格证书"].iter().any(|l| text.contains(l));
    if labelled {
        Validation::Valid
    } else {
        Validation::Inconclusive
    }
}

// ---- MAC address ----

fn mac_hex(text: &str) -> String {
    strip_separators(text, &[':', '-', '.']).to_ascii_uppercase()
}

pub fn validate_mac_address(text: &str) -> Validation {
    let hex = mac_hex(text);
    if hex.len() != 12 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return Validation::Invalid;
    }
    if hex.len() == text.trim().len() {
        // Twelve bare hex digits are just as likely a number or a hash.
        Validation::Inconclusive
    } else {
        Validation::Valid
    }
}

fn mac_address_blacklisted(text: &str) -> bool {
    let hex = mac_hex(text);
    all_same(&hex) || hex == "FFFFFFFFFFFF"
}

// ---- connection strings, tokens, keys ----

const JDBC_PREFIXES: &[&str] = &[
    "jdbc:mysql", "jdbc:postgresql", "jdbc:oracle", "jdbc:sqlserver", "jdbc:mariadb",
    "jdbc:h2", "jdbc:sqlite", "jdbc:db2", "jdbc:derby", "mongodb", "redis",
];

pub fn validate_jdbc(text: &str) -> Validation {
    let conn = text.trim().to_lowercase();
    let known = JDBC_PREFIXES.iter().any(|p| conn.starts_with(p));
    let has_secret = ["password", "passwd", "pwd"].iter().any(|k| conn.contains(k));
    if known || has_secret {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

/// A token whose header decodes to a JSON object naming `alg` or `typ` is a
/// confirmed JWT.
pub fn validate_jwt(text: &str) -> Validation {
    let token = text.trim();
    let mut parts = token.split('.');
    let (Some(header), Some(_)) = (parts.next(), parts.next()) else {
        return Validation::Invalid;
    };
    let decoded = URL_SAFE_NO_PAD.decode(header.trim_end_matches('='));
    if let Ok(bytes) = decoded {
        if let Ok(serde_json::Value::Object(map)) = serde_json::from_slice::<serde_json::Value>(&bytes) {
            if map.contains_key("alg") || map.contains_key("typ") {
                return Validation::Valid;
            }
        }
    }
    if token.starts_with("eyJ") {
        Validation::Inconclusive
    } else {
        Validation::Invalid
    }
}

pub fn validate_cloud_key(text: &str) -> Validation {
    let key = text.trim();
    if ["LTAI", "AKID", "AKIA", "ASIA", "ABIA", "ACCA"].iter().any(|p| key.starts_with(p)) {
        return Validation::Valid;
    }
    let mixed = key.chars().any(|c| c.is_alphabetic()) && key.chars().any(|c| c.is_ascii_digit());
    if key.chars().count() >= 16 && mixed {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

fn cloud_key_blacklisted(text: &str) -> bool {
    let key = text.trim();
    distinct_chars(key) <= 2
}

pub fn validate_wechat(text: &str) -> Validation {
    let id = text.trim();
    let len = id.chars().count();
    if (id.starts_with('o') && len == 28)
        || ((id.starts_with("ww") || id.starts_with("wx")) && len == 18)
        || len == 32
    {
        Validation::Valid
    } else {
        Validation::Invalid
    }
}

pub fn validate_sensitive_field(text: &str) -> Validation {
    let field = text.trim();
    if field.contains("PRIVATE KEY") {
        return Validation::Valid;
    }
    let lower = field.to_lowercase();
    let names = ["password", "passwd", "pwd", "pass", "secret", "token", "key", "auth", "credential", "private"];
    if names.iter().any(|n| lower.contains(n)) {
        Validation::Valid
    } else if ["user", "account", "login"].iter().any(|n| lower.contains(n)) {
        Validation::Inconclusive
    } else {
        Validation::Invalid
    }
}

fn sensitive_field_blacklisted(text: &str) -> bool {
    let lower = text.trim().to_lowercase();
    [
        "xxx", "your_", "example", "placeholder", "null", "none", "undefined", "empty", "test",
        "demo", "sample",
    ]
    .iter()
    .any(|p| lower.contains(p))
}
