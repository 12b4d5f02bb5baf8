//! 설정 파일 관리.
//!
//! 플랫폼별 설정 디렉토리의 JSON 파일을 로드하고, `section.field` 키 단위로
//! 수정해 다시 저장한다. 환경 변수 오버라이드는 실행 시 설정에만 적용되고
//! 파일에는 기록되지 않는다.

use crate::config::{AppConfig, ENV_EXPERIMENT_ID, ENV_SERVER_URL};
use crate::error::CoreError;
use directories::ProjectDirs;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// 설정 파일 이름
const CONFIG_FILE_NAME: &str = "config.json";

/// 설정 관리자
#[derive(Debug, Clone)]
pub struct ConfigManager {
    /// 파일에 저장된 그대로의 설정
    stored: AppConfig,
    /// 로드 시점에 읽은 오버라이드 환경 변수
    env: Vec<(&'static str, String)>,
    config_path: PathBuf,
}

impl ConfigManager {
    /// 플랫폼 기본 경로로 설정 관리자 생성
    pub fn new() -> Result<Self, CoreError> {
        Self::with_path(Self::config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// 지정된 경로로 설정 관리자 생성
    ///
    /// 파일이 없으면 기본 설정으로 만든다.
    pub fn with_path(config_path: PathBuf) -> Result<Self, CoreError> {
        Self::with_env_lookup(config_path, |key| std::env::var(key).ok())
    }

    /// 임의 조회 함수로 오버라이드 환경 변수를 읽는 생성자
    pub fn with_env_lookup<F>(config_path: PathBuf, lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = [ENV_SERVER_URL, ENV_EXPERIMENT_ID]
            .into_iter()
            .filter_map(|key| lookup(key).map(|value| (key, value)))
            .collect();

        let stored = if config_path.exists() {
            read_config(&config_path)?
        } else {
            let defaults = AppConfig::default_config();
            write_config(&config_path, &defaults)?;
            info!("기본 설정 파일 생성: {}", config_path.display());
            defaults
        };

        Ok(Self {
            stored,
            env,
            config_path,
        })
    }

    /// 실행 시 설정 (파일 + 환경 변수 오버라이드)
    pub fn get(&self) -> AppConfig {
        let mut config = self.stored.clone();
        config.apply_overrides_from(|key| {
            self.env
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
        });
        config
    }

    /// 파일에 저장된 설정
    pub fn stored(&self) -> &AppConfig {
        &self.stored
    }

    /// `section.field` 키 하나를 바꾸고 파일에 저장
    ///
    /// 값은 기존 필드 타입(문자열/숫자/불리언)에 맞춰 해석한다.
    /// 저장된 설정을 반환한다.
    pub fn set(&mut self, key: &str, raw: &str) -> Result<&AppConfig, CoreError> {
        let mut tree = serde_json::to_value(&self.stored)?;
        let slot = key
            .split('.')
            .try_fold(&mut tree, |node, part| node.get_mut(part))
            .filter(|slot| !slot.is_object())
            .ok_or_else(|| CoreError::validation(key, "알 수 없는 설정 키"))?;
        *slot = parse_like(slot, raw).ok_or_else(|| {
            CoreError::validation(key, format!("값 형식이 맞지 않음: {raw}"))
        })?;

        let updated: AppConfig = serde_json::from_value(tree)
            .map_err(|e| CoreError::validation(key, e.to_string()))?;
        write_config(&self.config_path, &updated)?;
        self.stored = updated;
        debug!("설정 저장: {key} = {raw}");
        Ok(&self.stored)
    }

    /// 설정 파일 경로 반환
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// 플랫폼별 설정 디렉토리 경로
    ///
    /// - macOS: `~/Library/Application Support/dev.streamprobe.streamprobe/`
    /// - Windows: `%APPDATA%\streamprobe\streamprobe\config\`
    /// - Linux: `~/.config/streamprobe/`
    pub fn config_dir() -> Result<PathBuf, CoreError> {
        ProjectDirs::from("dev", "streamprobe", "streamprobe")
            .map(|dirs| dirs.config_dir().to_path_buf())
            .ok_or_else(|| CoreError::Config("홈 디렉토리를 찾을 수 없습니다".to_string()))
    }
}

/// 기존 값과 같은 JSON 타입으로 해석
fn parse_like(current: &Value, raw: &str) -> Option<Value> {
    match current {
        Value::String(_) => Some(Value::String(raw.to_string())),
        Value::Bool(_) => raw.parse::<bool>().ok().map(Value::Bool),
        Value::Number(_) => serde_json::from_str::<Value>(raw)
            .ok()
            .filter(Value::is_number),
        _ => None,
    }
}

fn read_config(path: &Path) -> Result<AppConfig, CoreError> {
    let content = fs::read_to_string(path).map_err(|e| {
        CoreError::Config(format!("설정 파일 읽기 실패: {}: {e}", path.display()))
    })?;
    let config = serde_json::from_str(&content).map_err(|e| {
        CoreError::Config(format!("설정 파일 파싱 실패: {}: {e}", path.display()))
    })?;
    debug!("설정 파일 로드: {}", path.display());
    Ok(config)
}

fn write_config(path: &Path, config: &AppConfig) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| {
            CoreError::Config(format!("설정 디렉토리 생성 실패: {}: {e}", parent.display()))
        })?;
    }
    let content = serde_json::to_string_pretty(config)?;
    fs::write(path, content).map_err(|e| {
        CoreError::Config(format!("설정 파일 저장 실패: {}: {e}", path.display()))
    })
}
