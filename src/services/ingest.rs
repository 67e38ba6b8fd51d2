//! 组件抓取入库
//!
//! 在页面上下文内 fetch 组件 JSON（带着页面自己的 Cookie），解析后
//! 追加进仓库。网络失败、非 2xx、JSON 畸形一律记日志后吞掉——入库
//! 失败只是这一个 URL 的 no-op，绝不是致命错误。

use tracing::{debug, warn};

use crate::dom::Dom;
use crate::error::IngestError;
use crate::models::{Component, ComponentStore};

/// 抓取并入库一个组件 URL，返回新收录的组件数
pub async fn ingest_components<D: Dom>(dom: &D, store: &mut ComponentStore, url: &str) -> usize {
    let components = match fetch_components(dom, url).await {
        Ok(components) => components,
        Err(e) => {
            warn!("⚠️ {}", e);
            return 0;
        }
    };

    let added = components
        .into_iter()
        .filter(|c| store.insert(c.clone()))
        .count();
    debug!(
        "组件入库: {} 新增 {} 条，仓库共 {} 条",
        url,
        added,
        store.len()
    );
    added
}

/// 抓取并解析；解析不动的单条记录跳过，不拖累同批其他记录
async fn fetch_components<D: Dom>(dom: &D, url: &str) -> Result<Vec<Component>, IngestError> {
    let body = dom
        .fetch_json(url)
        .await
        .map_err(|e| IngestError::FetchFailed {
            url: url.to_string(),
            source: e.into(),
        })?;

    let entries = body.as_array().ok_or_else(|| IngestError::NotAnArray {
        url: url.to_string(),
    })?;

    let mut components = Vec::new();
    for entry in entries {
        match Component::from_json(entry) {
            Ok(c) => components.push(c),
            Err(e) => debug!("跳过无法解析的组件记录: {}", e),
        }
    }
    Ok(components)
}
