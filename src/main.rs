// ==========================================
// 产品目录门户 - 命令行入口
// ==========================================
// 用法: catalog-portal [--db <path>] <command> [args]
// 输出: 结果写 stdout（JSON / CSV），日志与错误写 stderr
// ==========================================

use std::process::ExitCode;

use catalog_portal::api::{map_api_error, ApiError, TemplateFormat, TemplateOutput};
use catalog_portal::app::{get_default_db_path, AppState};
use serde::Serialize;

const USAGE: &str = "\
用法: catalog-portal [--db <path>] <command> [args]

命令:
  categories                                  列出全部品类
  grid <category>                             管理端表格配置
  template <category> [--sample] [--json | --format csv|json]
                                              下载导入模板
  templates-info <category>...                模板元数据
  import <category> <file.csv>                导入 CSV
  import-batch <category>=<file.csv>...       并发导入多个品类
  batches [--category <id>] [--limit <n>]     最近导入批次
  resolve <part_number>                       跨品类按编号查找
  search <query> [--limit <n>]                统一检索
  refresh                                     重载品类元数据
  config                                      当前配置快照
  config-set <key> <value>                    覆写配置
";

/// 命令行错误（用法错误 / 业务错误）
enum CliError {
    Usage(String),
    Api(ApiError),
    Io(std::io::Error),
}

impl From<ApiError> for CliError {
    fn from(err: ApiError) -> Self {
        CliError::Api(err)
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Io(err)
    }
}

type CliResult = Result<(), CliError>;

/// 取出 `--name value` 形式的选项
fn take_option(args: &mut Vec<String>, name: &str) -> Option<String> {
    let pos = args.iter().position(|a| a == name)?;
    if pos + 1 >= args.len() {
        args.remove(pos);
        return None;
    }
    let value = args.remove(pos + 1);
    args.remove(pos);
    Some(value)
}

/// 取出布尔开关
fn take_flag(args: &mut Vec<String>, name: &str) -> bool {
    match args.iter().position(|a| a == name) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn parse_limit(raw: Option<String>) -> Result<Option<usize>, CliError> {
    match raw {
        None => Ok(None),
        Some(raw) => raw
            .parse::<usize>()
            .map(Some)
            .map_err(|_| CliError::Usage(format!("limit 必须为正整数: {}", raw))),
    }
}

fn print_json<T: Serialize>(value: &T) -> CliResult {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CliError::Api(ApiError::InternalError(e.to_string())))?;
    println!("{}", json);
    Ok(())
}

fn positional(args: &[String], index: usize, what: &str) -> Result<String, CliError> {
    args.get(index)
        .cloned()
        .ok_or_else(|| CliError::Usage(format!("缺少参数: {}", what)))
}

async fn run(state: &AppState, command: &str, mut args: Vec<String>) -> CliResult {
    match command {
        "categories" => print_json(&state.catalog_api.list_categories()),
        "grid" => {
            let category = positional(&args, 0, "category")?;
            print_json(&state.catalog_api.grid_config(&category)?)
        }
        "template" => {
            let include_sample = take_flag(&mut args, "--sample");
            let json = take_flag(&mut args, "--json");
            let format = match take_option(&mut args, "--format") {
                None if json => TemplateFormat::Json,
                None => TemplateFormat::Csv,
                Some(raw) => TemplateFormat::parse(&raw)
                    .ok_or_else(|| CliError::Usage(format!("不支持的模板格式: {}", raw)))?,
            };
            let category = positional(&args, 0, "category")?;
            match state
                .template_api
                .get_template(&category, include_sample, format)?
            {
                TemplateOutput::Csv { filename, content } => {
                    tracing::info!(filename = %filename, bytes = content.len(), "模板已生成");
                    use std::io::Write;
                    std::io::stdout().write_all(&content)?;
                    Ok(())
                }
                TemplateOutput::Json { info } => print_json(&info),
            }
        }
        "templates-info" => print_json(&state.template_api.templates_info(&args)?),
        "import" => {
            let category = positional(&args, 0, "category")?;
            let file = positional(&args, 1, "file")?;
            let content = std::fs::read(&file)?;
            print_json(&state.import_api.import_csv(&category, content).await?)
        }
        "import-batch" => {
            if args.is_empty() {
                return Err(CliError::Usage("缺少参数: <category>=<file.csv>".to_string()));
            }
            let mut files = Vec::with_capacity(args.len());
            for arg in &args {
                let (category, file) = arg
                    .split_once('=')
                    .ok_or_else(|| CliError::Usage(format!("参数格式应为 <category>=<file.csv>: {}", arg)))?;
                files.push((category.to_string(), std::fs::read(file)?));
            }
            print_json(&state.import_api.batch_import(files).await?)
        }
        "batches" => {
            let category = take_option(&mut args, "--category");
            let limit = parse_limit(take_option(&mut args, "--limit"))?.unwrap_or(20);
            print_json(&state.import_api.list_recent_batches(category, limit).await?)
        }
        "resolve" => {
            let key = positional(&args, 0, "part_number")?;
            match state.catalog_api.resolve(&key).await? {
                Some(resolution) => print_json(&resolution),
                None => Err(CliError::Api(ApiError::NotFound(key))),
            }
        }
        "search" => {
            let limit = parse_limit(take_option(&mut args, "--limit"))?;
            let query = args.join(" ");
            print_json(&state.search_api.search(&query, limit).await?)
        }
        "refresh" => {
            let count = state.catalog_api.refresh_metadata()?;
            print_json(&serde_json::json!({ "categories": count }))
        }
        "config" => {
            let snapshot = state
                .config_manager
                .get_config_snapshot()
                .map_err(|e| CliError::Api(ApiError::DatabaseError(e.to_string())))?;
            println!("{}", snapshot);
            Ok(())
        }
        "config-set" => {
            let key = positional(&args, 0, "key")?;
            let value = positional(&args, 1, "value")?;
            state
                .config_manager
                .update_config(&key, &value)
                .map_err(|e| CliError::Api(ApiError::ValidationError(e.to_string())))?;
            Ok(())
        }
        other => Err(CliError::Usage(format!("未知命令: {}", other))),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    catalog_portal::logging::init();
    catalog_portal::i18n::init_from_env();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = take_option(&mut args, "--db").unwrap_or_else(get_default_db_path);

    if args.is_empty() || take_flag(&mut args, "--help") {
        eprint!("{}", USAGE);
        return ExitCode::from(2);
    }
    let command = args.remove(0);

    tracing::info!(
        version = catalog_portal::VERSION,
        db_path = %db_path,
        command = %command,
        "{}",
        catalog_portal::APP_NAME
    );

    let state = match AppState::new(db_path) {
        Ok(state) => state,
        Err(e) => {
            tracing::error!(error = %e, "AppState初始化失败");
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(&state, &command, args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(msg)) => {
            eprintln!("{}\n\n{}", msg, USAGE);
            ExitCode::from(2)
        }
        Err(CliError::Api(err)) => {
            eprintln!("{}", map_api_error(err));
            ExitCode::FAILURE
        }
        Err(CliError::Io(err)) => {
            eprintln!("{}", err);
            ExitCode::FAILURE
        }
    }
}
