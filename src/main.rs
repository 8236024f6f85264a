use anyhow::{anyhow, bail, Context, Result};
use filter_blocks::prelude::*;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const HELP: &str = r#"输入格式: [or] <字段> <运算符> <JSON值>
  status = "open"
  or priority >= 3
  tag in ["a", "b"]
  owner is null
命令:
  :explain  显示当前过滤条件
  :sql      显示生成的 SQL
  :reset    清空过滤条件
  :help     显示帮助
  :quit     退出"#;

/// 运算符最多由三个单词组成（`is not null`）
const MAX_OPERATOR_WORDS: usize = 3;

#[derive(Debug, PartialEq)]
enum Command {
    Add {
        logic: Logic,
        field: String,
        operator: Operator,
        value: Literal,
    },
    Explain,
    Sql,
    Reset,
    Help,
    Quit,
}

fn parse_line(line: &str) -> Result<Command> {
    let line = line.trim();
    if let Some(command) = line.strip_prefix(':') {
        return match command.trim() {
            "explain" => Ok(Command::Explain),
            "sql" => Ok(Command::Sql),
            "reset" => Ok(Command::Reset),
            "help" => Ok(Command::Help),
            "quit" | "exit" => Ok(Command::Quit),
            other => bail!("unknown command `:{}`", other),
        };
    }

    let mut words: Vec<&str> = line.split_whitespace().collect();
    let logic = match words.first() {
        Some(word) if word.eq_ignore_ascii_case("or") => {
            words.remove(0);
            Logic::Or
        }
        _ => Logic::And,
    };

    let (field, rest) = words
        .split_first()
        .ok_or_else(|| anyhow!("expected `<field> <operator> <value>`"))?;

    // 最长匹配优先
    let longest = MAX_OPERATOR_WORDS.min(rest.len());
    let (operator, taken) = (1..=longest)
        .rev()
        .find_map(|n| {
            rest[..n]
                .join(" ")
                .parse::<Operator>()
                .ok()
                .map(|op| (op, n))
        })
        .ok_or_else(|| anyhow!("no operator after `{}`", field))?;

    let raw = rest[taken..].join(" ");
    let value = if !operator.takes_value() {
        Literal::Null
    } else if raw.is_empty() {
        bail!("operator `{}` needs a value", operator);
    } else {
        // 不是合法JSON时按字符串处理
        serde_json::from_str(&raw).unwrap_or(Literal::String(raw))
    };

    Ok(Command::Add {
        logic,
        field: field.to_string(),
        operator,
        value,
    })
}

fn load_config(path: Option<String>) -> Result<CompilerConfig> {
    match path {
        Some(path) => CompilerConfig::from_json_file(&path)
            .with_context(|| format!("failed to load config `{}`", path)),
        None => Ok(CompilerConfig::default()),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// 返回 `false` 表示退出
fn execute(
    command: Command,
    filter: &mut Filter,
    config: &CompilerConfig,
    compiler: &SqlCompiler,
) -> Result<bool> {
    match command {
        Command::Add {
            logic,
            field,
            operator,
            value,
        } => {
            match logic {
                Logic::And => filter.where_(&field, operator, value)?,
                Logic::Or => filter.or_where(&field, operator, value)?,
            };
            println!("{}", filter.explain()?);
        }
        Command::Explain => println!("{}", filter.explain()?),
        Command::Sql => println!("{}", compiler.compile(&*filter)?),
        Command::Reset => {
            *filter = config.new_filter();
            println!("filter cleared");
        }
        Command::Help => println!("{}", HELP),
        Command::Quit => return Ok(false),
    }
    Ok(true)
}

fn main() -> Result<()> {
    init_tracing();

    let config = load_config(std::env::args().nth(1))?;
    let compiler = SqlCompiler::from_config(config.clone());
    let mut filter = config.new_filter();

    println!("--- filter_blocks: 过滤条件到 SQL ---");
    println!("table: {}, dialect: {:?}", config.table, config.dialect);
    println!("输入 :help 查看用法\n");

    let mut rl = DefaultEditor::new().context("failed to initialize line editor")?;
    loop {
        match rl.readline("filter> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(trimmed);

                let result = parse_line(trimmed)
                    .and_then(|command| execute(command, &mut filter, &config, &compiler));
                match result {
                    Ok(true) => {}
                    Ok(false) => break,
                    Err(e) => eprintln!("✗ {:#}", e),
                }
            }
            Err(ReadlineError::Interrupted) => println!(),
            Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("readline failed"),
        }
    }
    Ok(())
}
