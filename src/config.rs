/// 程序配置
#[derive(Clone, Debug)]
pub struct Config {
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    /// 识图出题用的模型
    pub vision_model_name: String,
    /// 学习分析用的模型
    pub mentor_model_name: String,
    // --- 重试策略 ---
    pub retry_max_attempts: u32,
    pub retry_initial_delay_ms: u64,
    pub retry_backoff_multiplier: f64,
    // --- 站点生成 ---
    /// 每批并发处理的候选页数量
    pub batch_size: usize,
    /// 页面渲染缩放比例
    pub render_scale: f32,
    /// JPEG 编码质量 (1-100)
    pub jpeg_quality: u8,
    /// 目标站数 (1-10)
    pub station_count: usize,
    /// 每站倒计时秒数 (10-120)
    pub seconds_per_station: u32,
    // --- 输入输出 ---
    /// 自定义章节表 (TOML)
    pub sections_file: Option<String>,
    /// 参考文档：PDF 文件或已渲染好的页面图片目录
    pub source_path: Option<String>,
    /// 选中的章节 ID
    pub section_id: Option<String>,
    /// 具体主题（为空时使用章节名）
    pub topic: String,
    /// 站点图片导出目录
    pub export_dir: Option<String>,
    /// 是否显示详细日志
    pub verbose_logging: bool,
}

pub const MIN_STATIONS: usize = 1;
pub const MAX_STATIONS: usize = 10;
pub const MIN_SECONDS_PER_STATION: u32 = 10;
pub const MAX_SECONDS_PER_STATION: u32 = 120;

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_api_key: String::new(),
            llm_api_base_url: "https://generativelanguage.googleapis.com/v1beta/openai".to_string(),
            vision_model_name: "gemini-2.5-flash".to_string(),
            mentor_model_name: "gemini-3-pro-preview".to_string(),
            retry_max_attempts: 3,
            retry_initial_delay_ms: 2000,
            retry_backoff_multiplier: 2.0,
            batch_size: 3,
            render_scale: 1.2,
            jpeg_quality: 70,
            station_count: 5,
            seconds_per_station: 30,
            sections_file: None,
            source_path: None,
            section_id: None,
            topic: String::new(),
            export_dir: None,
            verbose_logging: false,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            llm_api_key: std::env::var("LLM_API_KEY").unwrap_or(default.llm_api_key),
            llm_api_base_url: std::env::var("LLM_API_BASE_URL").unwrap_or(default.llm_api_base_url),
            vision_model_name: std::env::var("VISION_MODEL_NAME").unwrap_or(default.vision_model_name),
            mentor_model_name: std::env::var("MENTOR_MODEL_NAME").unwrap_or(default.mentor_model_name),
            retry_max_attempts: std::env::var("RETRY_MAX_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_max_attempts),
            retry_initial_delay_ms: std::env::var("RETRY_INITIAL_DELAY_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_initial_delay_ms),
            retry_backoff_multiplier: std::env::var("RETRY_BACKOFF_MULTIPLIER").ok().and_then(|v| v.parse().ok()).unwrap_or(default.retry_backoff_multiplier),
            batch_size: std::env::var("BATCH_SIZE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.batch_size),
            render_scale: std::env::var("RENDER_SCALE").ok().and_then(|v| v.parse().ok()).unwrap_or(default.render_scale),
            jpeg_quality: std::env::var("JPEG_QUALITY").ok().and_then(|v| v.parse().ok()).unwrap_or(default.jpeg_quality),
            station_count: std::env::var("STATION_COUNT").ok().and_then(|v| v.parse().ok()).unwrap_or(default.station_count),
            seconds_per_station: std::env::var("SECONDS_PER_STATION").ok().and_then(|v| v.parse().ok()).unwrap_or(default.seconds_per_station),
            sections_file: std::env::var("SECTIONS_FILE").ok().or(default.sections_file),
            source_path: std::env::var("SOURCE_PATH").ok().or(default.source_path),
            section_id: std::env::var("SECTION_ID").ok().or(default.section_id),
            topic: std::env::var("STATION_TOPIC").unwrap_or(default.topic),
            export_dir: std::env::var("EXPORT_DIR").ok().or(default.export_dir),
            verbose_logging: std::env::var("VERBOSE_LOGGING").ok().and_then(|v| v.parse().ok()).unwrap_or(default.verbose_logging),
        }
        .normalized()
    }

    /// 把取值限制在界面允许的范围内
    pub fn normalized(mut self) -> Self {
        self.station_count = self.station_count.clamp(MIN_STATIONS, MAX_STATIONS);
        self.seconds_per_station = self
            .seconds_per_station
            .clamp(MIN_SECONDS_PER_STATION, MAX_SECONDS_PER_STATION);
        self.batch_size = self.batch_size.max(1);
        self.jpeg_quality = self.jpeg_quality.clamp(1, 100);
        if !(self.render_scale.is_finite() && self.render_scale > 0.0) {
            self.render_scale = Self::default().render_scale;
        }
        self
    }
}
