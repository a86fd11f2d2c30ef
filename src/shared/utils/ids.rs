use nanoid::nanoid;

/// ドキュメントIDに使う文字セット（英数字62文字）
const ALPHANUMERIC: [char; 62] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H',
    'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z',
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r',
    's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// タスクIDのサフィックス用文字セット（小文字英数字）
const LOWER_ALPHANUMERIC: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// ドキュメントIDの長さ（Firestoreの自動IDと同じ20文字）
pub const DOCUMENT_ID_LENGTH: usize = 20;

/// 新しいドキュメントIDを生成する
///
/// # 戻り値
/// 20文字の英数字ID
pub fn generate_document_id() -> String {
    nanoid!(DOCUMENT_ID_LENGTH, &ALPHANUMERIC)
}

/// タスクIDの末尾に付けるランダムなサフィックスを生成する
pub fn generate_suffix() -> String {
    nanoid!(12, &LOWER_ALPHANUMERIC)
}

/// ドキュメントIDとして使用可能かを検証する
///
/// # 検証条件
/// - 空でない
/// - `/` を含まない（コレクションパスと衝突するため）
/// - `.` / `..` ではない
pub fn is_valid_document_id(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains('/') && id != "." && id != ".."
}
