use anyhow::Result;
use quiz_auto_answer::orchestrator::App;
use quiz_auto_answer::utils::logging;
use quiz_auto_answer::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载配置
    let config = Config::from_env();

    // 初始化日志
    logging::init(config.verbose_logging);

    // 初始化并运行应用
    App::initialize(config).await?.run().await?;

    Ok(())
}
