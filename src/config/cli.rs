use crate::domain::model::{Ayanamsa, BirthQuery, DEFAULT_CHART_STYLE, DEFAULT_CHART_TYPE};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "vedic-proxy")]
#[command(about = "Vedic astrology proxy: token broker, profile fan-out and Dharma/Chakra classifier")]
pub struct CliConfig {
    /// TOML 設定檔；未指定時從環境變數讀取
    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// 合併命盤並輸出 Dharma Type / Chakra 分析 (JSON)
    Profile {
        #[command(flatten)]
        birth: BirthArgs,

        /// 交給 AI 洞察的問題
        #[arg(long)]
        question: Option<String>,
    },
    /// 輸出星盤 SVG
    Chart {
        #[command(flatten)]
        birth: BirthArgs,

        /// 寫入檔案而非 stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// 以已認證的 GET 透傳任意上游路徑
    Proxy {
        /// 例如 /v2/astrology/kundli
        path: String,

        /// 原始查詢字串 (逐字轉送)
        #[arg(long)]
        query: Option<String>,
    },
}

#[derive(Debug, Clone, Args)]
pub struct BirthArgs {
    /// ISO-8601 並帶有 UTC 偏移，例如 2024-01-15T10:30:00+05:30
    #[arg(long)]
    pub datetime: String,

    /// "lat,lon"
    #[arg(long, allow_hyphen_values = true)]
    pub coordinates: String,

    #[arg(long, default_value = "1")]
    pub ayanamsa: Ayanamsa,

    #[arg(long, default_value = DEFAULT_CHART_TYPE)]
    pub chart_type: String,

    #[arg(long, default_value = DEFAULT_CHART_STYLE)]
    pub chart_style: String,
}

impl From<BirthArgs> for BirthQuery {
    fn from(args: BirthArgs) -> Self {
        BirthQuery::new(args.datetime, args.coordinates)
            .with_ayanamsa(args.ayanamsa)
            .with_chart_type(args.chart_type)
            .with_chart_style(args.chart_style)
    }
}
