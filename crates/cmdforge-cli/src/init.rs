use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::Path;

use crate::cli::InitArgs;

const TEMPLATE: &str = r#"
# Dialect to render for; `--dialect` on the command line wins.
# standard | mysql | postgres | oracle | mongo | elastic6 | elastic7
dialect = "postgres"

# Quote every identifier, not just reserved words.
quote = false

# select | insert | update | delete
operation = "select"

# UPDATE/DELETE refuse to run without a [[where]] unless this is true.
allow_empty_filter = false

# Insert conflict handling: into | ignore | update.
# Falls back to a plain insert when the dialect cannot express it.
conflict = "into"
primary_key = ["id"]

# Wrap the SELECT into a row count.
count = false

[target]
table = "users"
# schema = "${APP_SCHEMA}"
# catalog = "app"

# [page]
# start = 0
# limit = 20

[[select]]
column = "id"

[[select]]
column = "name"

# [[select]]
# expr = "count(*) cnt"

[[where]]
op = "eq"        # eq ne gt ge lt le like not_like is_null is_not_null
                 # in not_in between not_between raw group
column = "state"
value = "active"

[[where]]
logic = "or"     # and | or | and_not | or_not
op = "group"

[[where.conditions]]
op = "gt"
column = "age"
value = 18

[[where.conditions]]
op = "in"
column = "role"
values = ["admin", "owner"]

[[order_by]]
column = "created_at"
order = "desc"   # default | asc | desc
# nulls = "last" # default | first | last

# [[set]]
# column = "name"
# value = "new name"
# term = "upper(?)"

# [[values]]
# column = "name"
# value = "a"
"#;

pub fn run(args: InitArgs) -> anyhow::Result<()> {
    write_template(&args.file)
}

fn write_template(path: &Path) -> anyhow::Result<()> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty());
    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)
            .map_err(|e| anyhow::anyhow!("cannot create {}: {e}", dir.display()))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            anyhow::bail!("refusing to overwrite {}", path.display())
        }
        Err(e) => anyhow::bail!("cannot create {}: {e}", path.display()),
    };
    file.write_all(TEMPLATE.trim_start().as_bytes())
        .map_err(|e| anyhow::anyhow!("cannot write {}: {e}", path.display()))?;

    println!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CommandFile;

    #[test]
    fn template_is_a_valid_command_file() {
        let file = CommandFile::parse(TEMPLATE).unwrap();
        assert_eq!(file.conditions.len(), 2);
        assert_eq!(file.select.len(), 2);
    }

    #[test]
    fn refuses_to_overwrite() {
        let dir = std::env::temp_dir().join(format!("cmdforge-init-test-{}", std::process::id()));
        let path = dir.join("nested").join("command.toml");
        let _ = std::fs::remove_dir_all(&dir);

        write_template(&path).unwrap();
        assert!(path.exists());
        let err = write_template(&path).unwrap_err();
        assert!(err.to_string().contains("refusing to overwrite"));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
