//! 邮件 HTML 布局

use market_shared::config::SiteConfig;

/// 转义 HTML 特殊字符
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 纯文本段落转为 HTML（按空行分段，段内换行转 `<br>`）
pub fn paragraphs(text: &str) -> String {
    text.split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| format!("<p>{}</p>", p.replace('\n', "<br>")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// 构建完整邮件
///
/// `heading` 与 `body_html` 必须已经转义。
pub fn email_layout(site: &SiteConfig, heading: &str, body_html: &str, accent_color: &str) -> String {
    let site_name = escape_html(&site.name);
    let site_url = escape_html(&site.base_url);

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{heading}</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background: {accent_color}; color: white; padding: 20px; border-radius: 8px 8px 0 0; }}
        .content {{ background: #f9f9f9; padding: 20px; border-radius: 0 0 8px 8px; }}
        .footer {{ text-align: center; color: #888; font-size: 12px; margin-top: 20px; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h1>{heading}</h1>
        </div>
        <div class="content">
            {body_html}
        </div>
        <div class="footer">
            <p>This email was sent automatically by <a href="{site_url}">{site_name}</a>. Please do not reply.</p>
        </div>
    </div>
</body>
</html>"#
    )
}
