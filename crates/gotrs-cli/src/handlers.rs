//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

use crate::cli::{BodyArgs, CompletionsArgs, DownloadArgs, QueryArgs, RequestArgs, UploadArgs};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::logging::timing::Timer;
use crate::output::OutputWriter;
use clap::CommandFactory;
use gotrs_core::http::Method;
use gotrs_core::{FileUpload, HttpClient, RequestOptions};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::{debug, info, instrument};

/// Handle the ping command
#[instrument(skip_all)]
pub async fn handle_ping(client: &HttpClient, output: &mut OutputWriter) -> Result<()> {
    let spinner = output.spinner("Checking server health...");
    let result = client.ping().await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    result?;

    output.success(&format!("✓ {} is healthy", client.config().base_url));
    Ok(())
}

/// Handle get and delete
#[instrument(skip(args, config, client, output), fields(path = %args.path))]
pub async fn handle_query(
    method: Method,
    args: QueryArgs,
    config: &Config,
    client: &HttpClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let options = request_options(&args.request, config)?;
    send(method, &args.path, options, client, output).await
}

/// Handle post, put and patch
#[instrument(skip(args, config, client, output), fields(path = %args.path))]
pub async fn handle_body(
    method: Method,
    args: BodyArgs,
    config: &Config,
    client: &HttpClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let mut options = request_options(&args.request, config)?;
    if let Some(body) = read_body(args.data.as_deref(), args.data_file.as_deref())? {
        options = options.body(body);
    }
    send(method, &args.path, options, client, output).await
}

async fn send(
    method: Method,
    path: &str,
    options: RequestOptions,
    client: &HttpClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("request", &format!("{} {}", method, path));
    info!(%method, path, "Sending request");

    let spinner = output.spinner(&format!("{} {}", method, path));
    let result = client.request::<Value>(method, path, options).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    output.data(&result?)
}

/// Handle the upload command
#[instrument(skip(args, config, client, output), fields(path = %args.path, file = %args.file.display()))]
pub async fn handle_upload(
    args: UploadArgs,
    config: &Config,
    client: &HttpClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("upload", &args.file.display().to_string());

    if !args.file.exists() {
        return Err(Error::FileNotFound { path: args.file });
    }
    let data = fs::read(&args.file)?;
    let filename = args
        .file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| Error::invalid_args(format!("Not a file name: {}", args.file.display())))?
        .to_string();
    debug!(bytes = data.len(), %filename, "Read upload file");
    output.info(&format!("Uploading {} ({} bytes)", filename, data.len()));

    let mut upload = FileUpload::new(data, filename);
    if let Some(content_type) = &args.content_type {
        upload = upload.with_content_type(content_type.clone());
    }
    for field in &args.fields {
        let (name, value) = parse_key_value(field, '=')?;
        upload = upload.field(name, value);
    }

    let options = request_options(&args.request, config)?;
    let spinner = output.spinner(&format!("Uploading {}", upload.filename()));
    let result = client
        .upload_file_with::<Value>(&args.path, upload, options)
        .await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }

    output.data(&result?)
}

/// Handle the download command
#[instrument(skip(args, config, client, output), fields(path = %args.path))]
pub async fn handle_download(
    args: DownloadArgs,
    config: &Config,
    client: &HttpClient,
    output: &mut OutputWriter,
) -> Result<()> {
    let _timer = Timer::with_details("download", &args.path);
    let options = request_options(&args.request, config)?;

    let spinner = output.spinner(&format!("Downloading {}", args.path));
    let result = client.download_file_with(&args.path, options).await;
    if let Some(pb) = spinner {
        pb.finish_and_clear();
    }
    let bytes = result?;

    match args.output_file {
        Some(path) => {
            fs::write(&path, &bytes)?;
            output.success(&format!("✓ Saved {} bytes to {}", bytes.len(), path.display()));
            Ok(())
        }
        None => output.raw(&bytes),
    }
}

/// Handle the completions command
pub fn handle_completions(args: CompletionsArgs) -> Result<()> {
    let mut command = crate::cli::Cli::command();
    let name = command.get_name().to_string();
    clap_complete::generate(
        args.shell.to_clap_shell(),
        &mut command,
        name,
        &mut std::io::stdout(),
    );
    Ok(())
}

/// Split `KEY<sep>VALUE`; surrounding whitespace is trimmed
fn parse_key_value(input: &str, separator: char) -> Result<(String, String)> {
    let (key, value) = input.split_once(separator).ok_or_else(|| {
        Error::invalid_args(format!("Expected KEY{}VALUE, got '{}'", separator, input))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(Error::invalid_args(format!("Empty key in '{}'", input)));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

/// Build request options from flags and configured default headers
fn request_options(args: &RequestArgs, config: &Config) -> Result<RequestOptions> {
    // Repeated keys collapse into one list parameter, in first-seen order.
    let mut params: Vec<(String, Vec<String>)> = Vec::new();
    for entry in &args.query {
        let (key, value) = parse_key_value(entry, '=')?;
        match params.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, values)) => values.push(value),
            None => params.push((key, vec![value])),
        }
    }

    let mut options = RequestOptions::new().headers(config.headers.clone());
    for (key, mut values) in params {
        options = if values.len() == 1 {
            options.param(key, values.remove(0))
        } else {
            options.param(key, values)
        };
    }
    for entry in &args.headers {
        let (name, value) = parse_key_value(entry, ':')?;
        options = options.header(name, value);
    }

    Ok(options)
}

/// Read a JSON body from an inline string or a JSON/YAML file
fn read_body(data: Option<&str>, data_file: Option<&Path>) -> Result<Option<Value>> {
    if let Some(inline) = data {
        return Ok(Some(serde_json::from_str(inline)?));
    }

    let Some(path) = data_file else {
        return Ok(None);
    };
    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let content = fs::read_to_string(path)?;
    let is_yaml = matches!(
        path.extension().and_then(|s| s.to_str()),
        Some("yaml") | Some("yml")
    );
    let value = if is_yaml {
        serde_yaml::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "YAML".to_string(),
        })?
    } else {
        serde_json::from_str(&content).map_err(|_| Error::InvalidFormat {
            path: path.to_path_buf(),
            expected: "JSON".to_string(),
        })?
    };

    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("status=open", '=').unwrap(),
            ("status".to_string(), "open".to_string())
        );
        assert_eq!(
            parse_key_value("X-Request-Id: abc", ':').unwrap(),
            ("X-Request-Id".to_string(), "abc".to_string())
        );
        assert_eq!(
            parse_key_value("q=a=b", '=').unwrap(),
            ("q".to_string(), "a=b".to_string())
        );
        assert!(matches!(parse_key_value("novalue", '='), Err(Error::InvalidArgs(_))));
        assert!(matches!(parse_key_value("=x", '='), Err(Error::InvalidArgs(_))));
    }

    #[test]
    fn test_request_options_group_repeated_keys() {
        let args = RequestArgs {
            query: vec!["tags=a".to_string(), "status=open".to_string(), "tags=b".to_string()],
            headers: vec!["X-Trace: 1".to_string()],
        };
        let config = Config {
            headers: HashMap::from([("X-Tenant".to_string(), "acme".to_string())]),
            ..Default::default()
        };

        let options = request_options(&args, &config).unwrap();
        assert_eq!(
            options.query_params(),
            &[
                ("tags".to_string(), json!(["a", "b"])),
                ("status".to_string(), json!("open")),
            ]
        );
        assert_eq!(options.extra_headers().get("X-Tenant").map(String::as_str), Some("acme"));
        assert_eq!(options.extra_headers().get("X-Trace").map(String::as_str), Some("1"));
        assert!(options.json_body().is_none());
    }

    #[test]
    fn test_read_inline_body() {
        let body = read_body(Some(r#"{"title": "Printer on fire"}"#), None).unwrap();
        assert_eq!(body, Some(json!({"title": "Printer on fire"})));
        assert_eq!(read_body(None, None).unwrap(), None);
        assert!(matches!(read_body(Some("{oops"), None), Err(Error::Json(_))));
    }

    #[test]
    fn test_read_body_from_files() {
        let mut yaml = tempfile::Builder::new().suffix(".yml").tempfile().unwrap();
        writeln!(yaml, "title: From YAML\npriority: 3").unwrap();
        let body = read_body(None, Some(yaml.path())).unwrap();
        assert_eq!(body, Some(json!({"title": "From YAML", "priority": 3})));

        let mut bad = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(bad, "not json").unwrap();
        assert!(matches!(
            read_body(None, Some(bad.path())),
            Err(Error::InvalidFormat { .. })
        ));

        let missing = read_body(None, Some(Path::new("/definitely/not/here.json")));
        assert!(matches!(missing, Err(Error::FileNotFound { .. })));
    }
}
