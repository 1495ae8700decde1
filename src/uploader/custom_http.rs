//! Generic templated HTTP uploader.
//!
//! Drives one request per file from a declarative profile: destination URL,
//! method, payload encoding, the form field carrying the file and the
//! response field carrying the resulting URL. Query parameters and a literal
//! request body can be supplied as JSON-encoded templates.

use async_trait::async_trait;
use regex::Regex;
use reqwest::{multipart, Client, Method};
use std::collections::HashMap;
use tokio::time::Duration;

use super::{collapse_options, mime_type_for, UploadOutcome, UploadTask, UploaderCapability};
use crate::errors::{AppError, AppResult};
use crate::profiles::ProfileOption;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpVerb {
    Post,
    Get,
    Put,
    Patch,
    Delete,
}

impl HttpVerb {
    fn parse(value: &str) -> AppResult<Self> {
        match value.to_ascii_uppercase().as_str() {
            "POST" => Ok(Self::Post),
            "GET" => Ok(Self::Get),
            "PUT" => Ok(Self::Put),
            "PATCH" => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            other => Err(AppError::validation(
                "method",
                &format!("Unsupported HTTP method: {}", other),
            )),
        }
    }

    fn as_method(self) -> Method {
        match self {
            Self::Post => Method::POST,
            Self::Get => Method::GET,
            Self::Put => Method::PUT,
            Self::Patch => Method::PATCH,
            Self::Delete => Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    MultipartForm,
    UrlEncodedForm,
    Json,
}

impl PayloadKind {
    fn parse(value: &str) -> AppResult<Self> {
        match value {
            "multipart/form-data" => Ok(Self::MultipartForm),
            "application/x-www-form-urlencoded" => Ok(Self::UrlEncodedForm),
            "application/json" => Ok(Self::Json),
            other => Err(AppError::validation(
                "contentType",
                &format!("Unsupported content type: {}", other),
            )),
        }
    }
}

#[derive(Debug, Clone)]
struct CustomOptions {
    url: String,
    method: HttpVerb,
    payload_kind: PayloadKind,
    file_field_name: String,
    response_url_field: String,
    /// Parsed `requestParams` template, sent as query parameters.
    query_params: Vec<(String, String)>,
    /// Parsed `requestBody` template, the body for non-multipart requests.
    body_template: serde_json::Map<String, serde_json::Value>,
}

pub struct CustomHttpUploader {
    client: Client,
    options: Option<CustomOptions>,
}

impl CustomHttpUploader {
    pub fn new() -> Self {
        Self {
            client: Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .build()
                .unwrap(),
            options: None,
        }
    }

    async fn try_upload(&self, task: &UploadTask) -> AppResult<UploadOutcome> {
        let options = self
            .options
            .as_ref()
            .ok_or_else(|| AppError::Config("Custom uploader used before configure".to_string()))?;

        let mut request = self
            .client
            .request(options.method.as_method(), &options.url);

        if !options.query_params.is_empty() {
            request = request.query(&options.query_params);
        }

        request = match options.payload_kind {
            PayloadKind::MultipartForm => {
                // Reading the whole file up front gives every part a known
                // size, so the client can set Content-Length before streaming.
                let contents = tokio::fs::read(&task.local_path).await?;
                let part = multipart::Part::bytes(contents)
                    .file_name(task.remote_name.clone())
                    .mime_str(&mime_type_for(&task.local_path))?;

                let mut form = multipart::Form::new();
                for (key, value) in template_as_text_fields(&options.body_template) {
                    form = form.text(key, value);
                }
                form = form.part(options.file_field_name.clone(), part);
                request.multipart(form)
            }
            PayloadKind::UrlEncodedForm => {
                request.form(&template_as_text_fields(&options.body_template))
            }
            PayloadKind::Json => request.json(&options.body_template),
        };

        log::debug!(
            "Custom upload {} -> {} ({})",
            task.local_path,
            options.url,
            task.remote_name
        );

        let response = request.send().await?;
        let status = response.status();
        let body: serde_json::Value = response.json().await?;

        match extract_result_url(&body, &options.response_url_field) {
            Some(url) => {
                log::info!("Uploaded {} as {}", task.local_path, url);
                Ok(UploadOutcome::success(url))
            }
            None => {
                // A missing field and a silent server rejection look the
                // same from here; status is the only extra context we have.
                log::warn!(
                    "Custom upload response ({}) had no '{}' field under 'data'",
                    status,
                    options.response_url_field
                );
                Ok(UploadOutcome::failure("Upload failed"))
            }
        }
    }
}

impl Default for CustomHttpUploader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UploaderCapability for CustomHttpUploader {
    fn name(&self) -> &'static str {
        "custom"
    }

    fn configure(&mut self, options: &[ProfileOption]) -> AppResult<()> {
        self.options = Some(parse_options(&collapse_options(options))?);
        Ok(())
    }

    async fn upload(&self, task: &UploadTask) -> UploadOutcome {
        match self.try_upload(task).await {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("Custom upload failed for {}: {}", task.local_path, e);
                UploadOutcome::failure(e.to_string())
            }
        }
    }
}

fn parse_options(map: &HashMap<String, String>) -> AppResult<CustomOptions> {
    let url = required(map, "url")?;

    let url_pattern = Regex::new(r"^https?://\S+$").unwrap();
    if !url_pattern.is_match(&url) || url.len() > 2000 {
        return Err(AppError::validation("url", "Must be a valid http(s) URL"));
    }

    Ok(CustomOptions {
        url,
        method: HttpVerb::parse(&required(map, "method")?)?,
        payload_kind: PayloadKind::parse(&required(map, "contentType")?)?,
        file_field_name: required(map, "fileFieldName")?,
        response_url_field: required(map, "responseUrlFieldName")?,
        query_params: parse_template(map.get("requestParams"), "requestParams")?
            .into_iter()
            .map(|(k, v)| (k, value_as_text(&v)))
            .collect(),
        body_template: parse_template(map.get("requestBody"), "requestBody")?,
    })
}

fn required(map: &HashMap<String, String>, name: &str) -> AppResult<String> {
    map.get(name)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::validation(name, "Required option is missing"))
}

/// Templates are JSON-encoded objects stored as profile option strings.
/// An absent or blank template is an empty object.
fn parse_template(
    raw: Option<&String>,
    field: &str,
) -> AppResult<serde_json::Map<String, serde_json::Value>> {
    let raw = match raw.map(|r| r.trim()).filter(|r| !r.is_empty()) {
        Some(raw) => raw,
        None => return Ok(serde_json::Map::new()),
    };

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(_) => Err(AppError::validation(field, "Template must be a JSON object")),
        Err(e) => Err(AppError::validation(
            field,
            &format!("Template is not valid JSON: {}", e),
        )),
    }
}

fn template_as_text_fields(
    template: &serde_json::Map<String, serde_json::Value>,
) -> HashMap<String, String> {
    template
        .iter()
        .map(|(k, v)| (k.clone(), value_as_text(v)))
        .collect()
}

fn value_as_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The result URL sits at `data.<field>` in the response body; anything else
/// counts as a failed upload.
fn extract_result_url(body: &serde_json::Value, field: &str) -> Option<String> {
    body.get("data")
        .and_then(|data| data.get(field))
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_options() -> Vec<ProfileOption> {
        [
            ("url", "https://img.example/api/upload"),
            ("method", "POST"),
            ("contentType", "multipart/form-data"),
            ("fileFieldName", "file"),
            ("responseUrlFieldName", "link"),
        ]
        .iter()
        .map(|(name, value)| ProfileOption {
            name: name.to_string(),
            value: value.to_string(),
        })
        .collect()
    }

    #[test]
    fn configure_accepts_a_complete_option_set() {
        let mut uploader = CustomHttpUploader::new();
        uploader.configure(&base_options()).unwrap();
        let options = uploader.options.as_ref().unwrap();
        assert_eq!(options.method, HttpVerb::Post);
        assert_eq!(options.payload_kind, PayloadKind::MultipartForm);
        assert_eq!(options.file_field_name, "file");
    }

    #[test]
    fn configure_rejects_missing_url_and_bad_method() {
        let mut uploader = CustomHttpUploader::new();

        let mut options = base_options();
        options.retain(|o| o.name != "url");
        assert!(uploader.configure(&options).is_err());

        let mut options = base_options();
        options.iter_mut().find(|o| o.name == "method").unwrap().value = "FETCH".to_string();
        assert!(uploader.configure(&options).is_err());

        let mut options = base_options();
        options.iter_mut().find(|o| o.name == "url").unwrap().value =
            "ftp://img.example/upload".to_string();
        assert!(uploader.configure(&options).is_err());
    }

    #[test]
    fn templates_parse_into_params_and_body() {
        let mut options = base_options();
        options.push(ProfileOption {
            name: "requestParams".to_string(),
            value: r#"{"key": "abc", "expire": 300}"#.to_string(),
        });
        options.push(ProfileOption {
            name: "requestBody".to_string(),
            value: r#"{"album": "screenshots"}"#.to_string(),
        });

        let mut uploader = CustomHttpUploader::new();
        uploader.configure(&options).unwrap();
        let parsed = uploader.options.as_ref().unwrap();

        assert!(parsed
            .query_params
            .contains(&("key".to_string(), "abc".to_string())));
        assert!(parsed
            .query_params
            .contains(&("expire".to_string(), "300".to_string())));
        assert_eq!(
            parsed.body_template.get("album").unwrap(),
            &serde_json::json!("screenshots")
        );
    }

    #[test]
    fn malformed_template_is_a_validation_error() {
        let mut options = base_options();
        options.push(ProfileOption {
            name: "requestBody".to_string(),
            value: "not json".to_string(),
        });
        let mut uploader = CustomHttpUploader::new();
        assert!(uploader.configure(&options).is_err());

        let mut options = base_options();
        options.push(ProfileOption {
            name: "requestBody".to_string(),
            value: "[1, 2]".to_string(),
        });
        let mut uploader = CustomHttpUploader::new();
        assert!(uploader.configure(&options).is_err());
    }

    #[test]
    fn result_url_must_sit_under_data() {
        let body = serde_json::json!({"data": {"link": "https://img.example/a.png"}});
        assert_eq!(
            extract_result_url(&body, "link").as_deref(),
            Some("https://img.example/a.png")
        );

        // Field present but at the top level does not count.
        let top_level = serde_json::json!({"link": "https://img.example/a.png"});
        assert_eq!(extract_result_url(&top_level, "link"), None);

        let wrong_field = serde_json::json!({"data": {"url": "https://img.example/a.png"}});
        assert_eq!(extract_result_url(&wrong_field, "link"), None);

        let non_string = serde_json::json!({"data": {"link": 42}});
        assert_eq!(extract_result_url(&non_string, "link"), None);
    }

    #[tokio::test]
    async fn upload_before_configure_fails_without_panicking() {
        let uploader = CustomHttpUploader::new();
        let task = UploadTask {
            local_path: "/tmp/missing.png".to_string(),
            remote_name: "abc.png".to_string(),
            target_directory: None,
            managed_mode: false,
        };
        let outcome = uploader.upload(&task).await;
        assert!(!outcome.success);
        assert!(outcome.error_message.is_some());
    }
}
