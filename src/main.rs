// ==========================================
// VZD 数据导入 - 命令行入口
// ==========================================
// 配置: 环境变量（见 config::config_keys）
// 输出: 运行结束时以 JSON 记录 RunReport
// ==========================================

use anyhow::Context;
use vzd_import::{logging, AppState, ImportRunner, ImportSettings};

fn main() -> anyhow::Result<()> {
    logging::init();

    tracing::info!("==================================================");
    tracing::info!("{} v{}", vzd_import::APP_NAME, vzd_import::VERSION);
    tracing::info!("==================================================");

    let settings = ImportSettings::from_env().context("读取运行配置失败")?;
    tracing::info!(
        db_path = %settings.db_path.display(),
        data_path = %settings.data_path.display(),
        "使用配置"
    );

    let state = AppState::new(&settings.db_path).context("初始化数据库失败")?;
    let runner = ImportRunner::new(state.repo.as_ref(), &settings);
    let report = runner.run().context("导入运行失败")?;

    let json = serde_json::to_string(&report).context("序列化运行报告失败")?;
    tracing::info!(report = %json, "运行报告");

    Ok(())
}
