use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::{
    config::BenchmarkProperties,
    error::{Error, Result},
};

/// A named SQL statement, one per `*.sql` file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkQuery {
    pub name: String,
    pub sql: String,
}

impl BenchmarkQuery {
    pub fn new(name: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql: sql.into(),
        }
    }

    /// Normalizes a statement read from disk so it can be sent as a single line:
    /// a trailing `;` is dropped and newlines become spaces.
    pub fn from_file_contents(name: impl Into<String>, contents: &str) -> Self {
        let statement = contents.trim_end();
        let statement = statement.strip_suffix(';').unwrap_or(statement);
        Self::new(name, statement.replace("\r\n", " ").replace('\n', " "))
    }
}

/// Loads benchmark queries from a directory of `*.sql` files.
#[derive(Debug, Clone)]
pub struct QueryLoader {
    sql_dir: PathBuf,
    names: Vec<String>,
}

impl QueryLoader {
    pub fn new(sql_dir: impl Into<PathBuf>) -> Self {
        Self {
            sql_dir: sql_dir.into(),
            names: vec![],
        }
    }

    pub fn from_properties(properties: &BenchmarkProperties) -> Self {
        Self {
            sql_dir: properties.sql_dir.clone(),
            names: properties.benchmark_names.clone(),
        }
    }

    /// Returns the queries sorted by name. When benchmark names are configured
    /// only those queries are returned.
    pub fn load_benchmark_queries(&self) -> Result<Vec<BenchmarkQuery>> {
        let entries = std::fs::read_dir(&self.sql_dir).map_err(|source| Error::QueryLoad {
            path: self.sql_dir.clone(),
            source,
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| Error::QueryLoad {
                path: self.sql_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "sql") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut queries = Vec::with_capacity(paths.len());
        for path in paths {
            let query = load_benchmark_query(&path)?;
            if self.names.is_empty() || self.names.contains(&query.name) {
                queries.push(query);
            }
        }
        tracing::info!(
            "Loaded {} benchmark queries from {}",
            queries.len(),
            self.sql_dir.display()
        );
        Ok(queries)
    }
}

fn load_benchmark_query(path: &Path) -> Result<BenchmarkQuery> {
    let contents = std::fs::read_to_string(path).map_err(|source| Error::QueryLoad {
        path: path.to_path_buf(),
        source,
    })?;
    let name = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    tracing::debug!("Loaded query {name} from {}", path.display());
    Ok(BenchmarkQuery::from_file_contents(name, &contents))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sql_dir(files: &[(&str, &str)]) -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        for (name, contents) in files {
            fs::write(dir.path().join(name), contents).unwrap();
        }
        dir
    }

    #[test]
    fn normalizes_statement() {
        let query = BenchmarkQuery::from_file_contents("q", "SELECT *\nFROM nation\nWHERE 1 = 1;\n");
        assert_eq!(query.sql, "SELECT * FROM nation WHERE 1 = 1");
    }

    #[test]
    fn only_one_semicolon_is_stripped() {
        let query = BenchmarkQuery::from_file_contents("q", "SELECT ';';;");
        assert_eq!(query.sql, "SELECT ';';");
    }

    #[test]
    fn loads_sql_files_sorted_by_name() {
        let dir = sql_dir(&[
            ("q2.sql", "SELECT 2;"),
            ("q1.sql", "SELECT\n1"),
            ("notes.txt", "not a query"),
        ]);

        let queries = QueryLoader::new(dir.path()).load_benchmark_queries().unwrap();

        assert_eq!(
            queries,
            vec![
                BenchmarkQuery::new("q1", "SELECT 1"),
                BenchmarkQuery::new("q2", "SELECT 2"),
            ]
        );
    }

    #[test]
    fn filters_by_configured_names() {
        let dir = sql_dir(&[("q1.sql", "SELECT 1"), ("q2.sql", "SELECT 2")]);
        let properties = BenchmarkProperties::builder()
            .sql_dir(dir.path())
            .benchmark_names(vec!["q2".to_string()])
            .build();

        let queries = QueryLoader::from_properties(&properties)
            .load_benchmark_queries()
            .unwrap();

        assert_eq!(queries, vec![BenchmarkQuery::new("q2", "SELECT 2")]);
    }

    #[test]
    fn missing_directory_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");

        let err = QueryLoader::new(&missing)
            .load_benchmark_queries()
            .unwrap_err();

        match err {
            Error::QueryLoad { path, .. } => assert_eq!(path, missing),
            other => panic!("unexpected error: {other}"),
        }
    }
}
