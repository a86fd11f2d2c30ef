use super::document::Document;

/// バッチ内の1書き込み操作
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// 新規作成（同じIDのドキュメントが既に存在する場合はコミット全体が失敗する）
    Create {
        collection: String,
        document: Document,
    },
    /// 作成または上書き
    Set {
        collection: String,
        document: Document,
    },
    /// 削除（存在しなくてもエラーにしない）
    Delete { collection: String, id: String },
}

impl WriteOp {
    /// 操作対象のコレクション名
    pub fn collection(&self) -> &str {
        match self {
            WriteOp::Create { collection, .. }
            | WriteOp::Set { collection, .. }
            | WriteOp::Delete { collection, .. } => collection,
        }
    }

    /// 操作対象のドキュメントID
    pub fn document_id(&self) -> &str {
        match self {
            WriteOp::Create { document, .. } | WriteOp::Set { document, .. } => &document.id,
            WriteOp::Delete { id, .. } => id,
        }
    }
}

/// 全件成功か全件失敗かの単位でコミットされる書き込みの集合
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    operations: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// 新規作成を追加する
    pub fn create(&mut self, collection: &str, document: Document) -> &mut Self {
        self.operations.push(WriteOp::Create {
            collection: collection.to_string(),
            document,
        });
        self
    }

    /// 作成または上書きを追加する
    pub fn set(&mut self, collection: &str, document: Document) -> &mut Self {
        self.operations.push(WriteOp::Set {
            collection: collection.to_string(),
            document,
        });
        self
    }

    /// 削除を追加する
    pub fn delete(&mut self, collection: &str, id: &str) -> &mut Self {
        self.operations.push(WriteOp::Delete {
            collection: collection.to_string(),
            id: id.to_string(),
        });
        self
    }

    /// ドキュメントを別コレクションへ移動する
    ///
    /// 移動先への書き込みと移動元の削除は同じコミットに入るため、
    /// 片方だけが反映されることはない。
    ///
    /// # 引数
    /// * `from` - 移動元コレクション
    /// * `to` - 移動先コレクション
    /// * `document` - 移動先に書き込む内容（IDは移動元と同じ）
    pub fn transfer(&mut self, from: &str, to: &str, document: Document) -> &mut Self {
        let id = document.id.clone();
        self.set(to, document);
        self.delete(from, &id)
    }

    /// 操作数
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// 操作が空かどうか
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// 操作一覧（追加順）
    pub fn operations(&self) -> &[WriteOp] {
        &self.operations
    }

    /// 操作一覧を取り出す
    pub fn into_operations(self) -> Vec<WriteOp> {
        self.operations
    }
}
