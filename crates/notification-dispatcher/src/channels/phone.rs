//! 肯尼亚手机号（MSISDN）校验
//!
//! 允许 `254` / `0` / `+254` 三种前缀，号段以 7 或 1 开头，后跟 8 位 ASCII 数字。
//! 输入按原样匹配，不做去空白等预处理。

use std::sync::LazyLock;

use regex::Regex;

static KENYAN_MSISDN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(254|0|\+254)[17][0-9]{8}$").expect("valid MSISDN regex"));

/// 校验手机号格式
pub fn is_valid_msisdn(phone: &str) -> bool {
    KENYAN_MSISDN.is_match(phone)
}

/// 校验并规范化为 E.164 格式（`+254XXXXXXXXX`），无效时返回 None
pub fn normalize_msisdn(phone: &str) -> Option<String> {
    let caps = KENYAN_MSISDN.captures(phone)?;
    let prefix_len = caps.get(1)?.len();
    Some(format!("+254{}", &phone[prefix_len..]))
}
