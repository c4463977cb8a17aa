//! 附件模型
//!
//! `AttachmentPayload` 描述一个附件：文件名、MIME 类型、描述，以及三种数据源
//! （内存字节、文件路径、异步字节流）中的恰好一种。构建器在每个 setter 上
//! 立即校验参数，`build()` 时再做一次整体校验。

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;

use crate::error::{NotifierError, Result};
use crate::validators::{is_not_empty, is_single_line};

const DEFAULT_DESCRIPTION: &str = "N/A";

type BoxedReader = Pin<Box<dyn AsyncRead + Send>>;

/// 附件字节流句柄
///
/// 可在多个持有者之间共享，但底层数据流只能被读取一次。
#[derive(Clone)]
pub struct AttachmentStream {
    inner: Arc<Mutex<Option<BoxedReader>>>,
}

impl AttachmentStream {
    pub fn new<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::pin(reader)))),
        }
    }

    /// 读取全部数据；第二次读取返回错误
    pub async fn read_to_end(&self) -> io::Result<Vec<u8>> {
        let reader = self.inner.lock().await.take();
        let Some(mut reader) = reader else {
            return Err(io::Error::other("附件数据流已被读取"));
        };

        let mut buf = Vec::new();
        reader.read_to_end(&mut buf).await?;
        Ok(buf)
    }
}

impl fmt::Debug for AttachmentStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AttachmentStream").finish_non_exhaustive()
    }
}

/// 附件数据源
#[derive(Debug, Clone)]
pub enum AttachmentSource {
    Bytes(Vec<u8>),
    File(PathBuf),
    Stream(AttachmentStream),
}

/// 已校验的附件
#[derive(Debug, Clone)]
pub struct AttachmentPayload {
    filename: String,
    content_type: String,
    description: String,
    source: AttachmentSource,
}

impl AttachmentPayload {
    pub fn builder() -> AttachmentPayloadBuilder {
        AttachmentPayloadBuilder::default()
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn source(&self) -> &AttachmentSource {
        &self.source
    }

    pub fn content(&self) -> Option<&[u8]> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn file(&self) -> Option<&Path> {
        match &self.source {
            AttachmentSource::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn input_stream(&self) -> Option<&AttachmentStream> {
        match &self.source {
            AttachmentSource::Stream(stream) => Some(stream),
            _ => None,
        }
    }

    /// 将任意数据源解析为字节
    pub async fn read_data(&self) -> io::Result<Vec<u8>> {
        match &self.source {
            AttachmentSource::Bytes(bytes) => Ok(bytes.clone()),
            AttachmentSource::File(path) => tokio::fs::read(path).await,
            AttachmentSource::Stream(stream) => stream.read_to_end().await,
        }
    }
}

/// 附件构建器
///
/// 单一所有者的临时对象，setter 按值传递并返回自身。
pub struct AttachmentPayloadBuilder {
    filename: Option<String>,
    content_type: Option<String>,
    description: String,
    content: Option<Vec<u8>>,
    file: Option<PathBuf>,
    input_stream: Option<AttachmentStream>,
}

impl Default for AttachmentPayloadBuilder {
    fn default() -> Self {
        Self {
            filename: None,
            content_type: None,
            description: DEFAULT_DESCRIPTION.to_string(),
            content: None,
            file: None,
            input_stream: None,
        }
    }
}

impl AttachmentPayloadBuilder {
    pub fn filename(mut self, filename: impl Into<String>) -> Result<Self> {
        self.filename = Some(non_empty("filename", filename.into())?);
        Ok(self)
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Result<Self> {
        self.content_type = Some(non_empty("content_type", content_type.into())?);
        Ok(self)
    }

    pub fn description(mut self, description: impl Into<String>) -> Result<Self> {
        self.description = non_empty("description", description.into())?;
        Ok(self)
    }

    pub fn content(mut self, content: impl Into<Vec<u8>>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn file(mut self, file: impl Into<PathBuf>) -> Result<Self> {
        let file = file.into();
        if file.as_os_str().is_empty() {
            return Err(NotifierError::invalid("file", "文件路径不能为空"));
        }
        self.file = Some(file);
        Ok(self)
    }

    pub fn input_stream(mut self, stream: AttachmentStream) -> Self {
        self.input_stream = Some(stream);
        self
    }

    pub fn build(self) -> Result<AttachmentPayload> {
        let filename = required("filename", self.filename)?;
        let content_type = required("content_type", self.content_type)?;
        let description = non_empty("description", self.description)?;

        let source = match (self.content, self.file, self.input_stream) {
            (Some(_), Some(_), Some(_)) => return Err(multiple_sources("content+file+input_stream")),
            (None, None, None) => {
                return Err(NotifierError::invalid("source", "未指定附件数据源"));
            }
            (Some(_), Some(_), None) => return Err(multiple_sources("content+file")),
            (Some(_), None, Some(_)) => return Err(multiple_sources("content+input_stream")),
            (None, Some(_), Some(_)) => return Err(multiple_sources("file+input_stream")),
            (Some(content), None, None) => AttachmentSource::Bytes(content),
            (None, Some(file), None) => AttachmentSource::File(file),
            (None, None, Some(stream)) => AttachmentSource::Stream(stream),
        };

        Ok(AttachmentPayload {
            filename,
            content_type,
            description,
            source,
        })
    }
}

fn non_empty(field: &'static str, value: String) -> Result<String> {
    if !is_not_empty(&value) {
        return Err(NotifierError::invalid(field, "不能为空"));
    }
    if !is_single_line(&value) {
        return Err(NotifierError::invalid(field, "不能包含换行或控制字符"));
    }
    Ok(value)
}

fn required(field: &'static str, value: Option<String>) -> Result<String> {
    let value = value.ok_or_else(|| NotifierError::invalid(field, "必填"))?;
    non_empty(field, value)
}

fn multiple_sources(combination: &str) -> NotifierError {
    NotifierError::invalid("source", format!("不能同时指定多个附件数据源: {combination}"))
}
