// ==========================================
// 产品目录门户 - 消息本地化
// ==========================================
// 文案: locales/*.yml（rust-i18n，lib.rs 中以 zh-CN 为回退语言初始化）
// 用途: 导入失败说明、API 错误消息、检索降级提示
// ==========================================

/// 语言选择环境变量
pub const LOCALE_ENV: &str = "CATALOG_PORTAL_LOCALE";

/// 已提供文案的语言
pub const SUPPORTED_LOCALES: [&str; 2] = ["zh-CN", "en"];

/// 当前语言
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// 切换语言；不支持的语言保持不变并返回 false
pub fn set_locale(locale: &str) -> bool {
    match SUPPORTED_LOCALES
        .iter()
        .find(|l| l.eq_ignore_ascii_case(locale.trim()))
    {
        Some(supported) => {
            rust_i18n::set_locale(supported);
            true
        }
        None => {
            tracing::warn!(locale = %locale, "不支持的语言，保持当前设置");
            false
        }
    }
}

/// 按环境变量选择语言（未设置时使用回退语言）
pub fn init_from_env() {
    if let Ok(locale) = std::env::var(LOCALE_ENV) {
        set_locale(&locale);
    }
}

/// 翻译消息（无参数）
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// 翻译消息并填充 `%{name}` 占位符
///
/// # 示例
/// ```no_run
/// use catalog_portal::i18n::t_with_args;
/// let msg = t_with_args("import.unknown_category", &[("category", "cable")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    args.iter()
        .fold(rust_i18n::t!(key).to_string(), |msg, (name, value)| {
            msg.replace(&format!("%{{{}}}", name), value)
        })
}
