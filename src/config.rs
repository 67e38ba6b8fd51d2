/// 程序配置文件
#[derive(Clone, Debug)]
pub struct Config {
    /// 浏览器调试端口
    pub browser_debug_port: u16,
    /// 目标页面 URL 片段（复用已打开的标签页）
    pub target_url_fragment: String,
    /// 找不到目标页面时新建页面导航到的 URL
    pub fallback_url: String,
    /// 组件请求 URL 的识别标记
    pub components_url_marker: String,
    /// 引擎轮询间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 异步控件稳定等待的重试次数
    pub settle_attempts: usize,
    /// 异步控件稳定等待的重试间隔（毫秒）
    pub settle_interval_ms: u64,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 输出日志文件
    pub output_log_file: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: 9222,
            target_url_fragment: "netacad.com".to_string(),
            fallback_url: "https://www.netacad.com".to_string(),
            components_url_marker: "components.json".to_string(),
            poll_interval_ms: 1000,
            settle_attempts: 5,
            settle_interval_ms: 100,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            browser_debug_port: std::env::var("BROWSER_DEBUG_PORT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.browser_debug_port),
            target_url_fragment: std::env::var("TARGET_URL_FRAGMENT").unwrap_or(default.target_url_fragment),
            fallback_url: std::env::var("FALLBACK_URL").unwrap_or(default.fallback_url),
            components_url_marker: std::env::var("COMPONENTS_URL_MARKER").unwrap_or(default.components_url_marker),
            poll_interval_ms: std::env::var("POLL_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.poll_interval_ms),
            settle_attempts: std::env::var("SETTLE_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_attempts),
            settle_interval_ms: std::env::var("SETTLE_INTERVAL_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.settle_interval_ms),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
        }
    }
}
