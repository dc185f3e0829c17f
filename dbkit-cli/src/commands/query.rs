//! Raw query command

use anyhow::{Context, Result};
use clap::Parser;
use dbkit_core::Binding;
use serde_json::Value;

use super::open_database;

#[derive(Parser, Debug)]
pub struct QueryArgs {
    /// SQL with `@name` placeholders
    pub sql: String,

    /// Bound input as name=value; the value is read as JSON, else as a string
    #[arg(short = 'i', long = "input", value_parser = parse_input)]
    pub inputs: Vec<Binding>,
}

fn parse_input(raw: &str) -> Result<Binding, String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{raw}'"))?;
    let name = name.trim().trim_start_matches('@');
    if name.is_empty() {
        return Err(format!("missing input name in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_owned()));
    Ok(Binding::new(name, value))
}

pub async fn run_query(args: QueryArgs, debug: bool) -> Result<()> {
    let db = open_database(debug)?;
    let result = db
        .set_inputs(args.inputs)
        .query(&args.sql)
        .await
        .into_result()
        .context("Query failed")?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_values_parse_as_json_first() {
        assert_eq!(parse_input("id=7").unwrap(), Binding::new("id", 7));
        assert_eq!(parse_input("ids=[1,2]").unwrap(), Binding::new("ids", json!([1, 2])));
        assert_eq!(parse_input("flag=null").unwrap(), Binding::new("flag", Value::Null));
    }

    #[test]
    fn input_values_fall_back_to_strings() {
        assert_eq!(parse_input("name=X").unwrap(), Binding::new("name", "X"));
        assert_eq!(parse_input("expr=a=b").unwrap(), Binding::new("expr", "a=b"));
        assert_eq!(parse_input("@name=").unwrap(), Binding::new("name", ""));
    }

    #[test]
    fn malformed_inputs_are_rejected() {
        assert!(parse_input("novalue").is_err());
        assert!(parse_input("=1").is_err());
    }
}
