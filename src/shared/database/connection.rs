use crate::shared::config::{get_database_filename, get_environment, StoreConfig};
use crate::shared::errors::{AppError, AppResult};
use rusqlite::Connection;
use std::path::{Path, PathBuf};

/// データディレクトリ配下のアプリケーション用フォルダ名
const APP_DIR_NAME: &str = "subscription-desk";

/// データベース接続を開き、テーブルを作成する
///
/// # 引数
/// * `database_path` - データベースファイルのパス
///
/// # 戻り値
/// データベース接続、または失敗時はエラー
pub fn initialize_database(database_path: &Path) -> AppResult<Connection> {
    let conn = Connection::open(database_path)?;

    create_tables(&conn)?;

    log::info!("データベースを初期化しました: {database_path:?}");

    Ok(conn)
}

/// データベースファイルのパスを決定する
///
/// `DATABASE_PATH` が設定されていればそれを使い、無ければ
/// OSのデータディレクトリ配下に環境別のファイル名で作成する。
///
/// # 戻り値
/// データベースファイルのパス、または失敗時はエラー
pub fn get_database_path(config: &StoreConfig) -> AppResult<PathBuf> {
    if let Some(path) = &config.database_path {
        return Ok(path.clone());
    }

    let app_data_dir = dirs::data_dir()
        .ok_or_else(|| AppError::configuration("データディレクトリを特定できません"))?
        .join(APP_DIR_NAME);

    if !app_data_dir.exists() {
        std::fs::create_dir_all(&app_data_dir).map_err(|e| {
            AppError::configuration(format!("アプリデータディレクトリの作成に失敗: {e}"))
        })?;
        log::info!("アプリケーションデータディレクトリを作成: {app_data_dir:?}");
    }

    Ok(app_data_dir.join(get_database_filename(get_environment())))
}

/// ドキュメント保存用のテーブルを作成する
///
/// 1行 = 1ドキュメント。`data` には型付きフィールドのJSONを保存する。
pub fn create_tables(conn: &Connection) -> AppResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS documents (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        [],
    )?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_documents_collection ON documents(collection)",
        [],
    )?;

    Ok(())
}

/// テーブルに指定されたカラムが存在するかチェックする
///
/// # 戻り値
/// カラムが存在する場合はtrue、存在しないかエラーの場合はfalse
#[cfg(test)]
fn check_column_exists(conn: &Connection, table_name: &str, column_name: &str) -> bool {
    let query = format!("PRAGMA table_info({table_name})");

    let Ok(mut stmt) = conn.prepare(&query) else {
        return false;
    };
    let Ok(rows) = stmt.query_map([], |row| row.get::<_, String>(1)) else {
        return false;
    };
    let found = rows.flatten().any(|name| name == column_name);
    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::config::StoreBackend;
    use tempfile::TempDir;

    #[test]
    fn test_create_tables() {
        let conn = Connection::open_in_memory().unwrap();

        assert!(create_tables(&conn).is_ok());
        // 2回目も成功する（冪等）
        assert!(create_tables(&conn).is_ok());

        for column in ["collection", "id", "data", "updated_at"] {
            assert!(
                check_column_exists(&conn, "documents", column),
                "カラム {column} が作成されていません"
            );
        }
    }

    #[test]
    fn test_check_column_exists() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute(
            "CREATE TABLE test_table (id INTEGER PRIMARY KEY, name TEXT)",
            [],
        )
        .unwrap();

        assert!(check_column_exists(&conn, "test_table", "name"));
        assert!(!check_column_exists(&conn, "test_table", "nonexistent"));
        assert!(!check_column_exists(&conn, "nonexistent_table", "id"));
    }

    #[test]
    fn test_initialize_database_file() {
        let temp_dir = TempDir::new().unwrap();
        let db_path = temp_dir.path().join("test.db");

        let conn = initialize_database(&db_path);
        assert!(conn.is_ok());
        assert!(db_path.exists());
    }

    #[test]
    fn test_get_database_path_prefers_configured_path() {
        let config = StoreConfig {
            backend: StoreBackend::Sqlite,
            database_path: Some(PathBuf::from("/tmp/custom.db")),
        };
        assert_eq!(
            get_database_path(&config).unwrap(),
            PathBuf::from("/tmp/custom.db")
        );
    }
}
