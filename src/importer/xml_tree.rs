// ==========================================
// VZD 数据导入 - XML 节点树与条目流
// ==========================================
// 职责:
// - XmlNode: 通用节点树（本地标签名 → 子节点/文本）
// - 点分路径导航（首个缺失段即返回默认值）
// - ItemStream: 流式读取 `<X>ItemList` 内的 `<X>ItemData` 子树
// 说明: 命名空间前缀剥离为本地名；实体引用逐个解析（预定义实体 + 字符引用），
//       未声明的实体原样保留
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

// ==========================================
// XmlNode
// ==========================================
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// 本地标签名（无命名空间前缀）
    pub name: String,
    /// 去首尾空白后的文本；无文本为 None
    pub text: Option<String>,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: None,
            children: Vec::new(),
        }
    }

    /// 首个同名子节点
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// 全部同名子节点
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// 按点分路径定位节点；任一段缺失返回 None
    pub fn find_path(&self, path: &str) -> Option<&XmlNode> {
        path.split('.')
            .filter(|s| !s.is_empty())
            .try_fold(self, |node, segment| node.child(segment))
    }

    /// 路径处的文本叶子值
    pub fn text_at(&self, path: &str) -> Option<&str> {
        self.find_path(path).and_then(|n| n.text.as_deref())
    }

    /// 路径取值
    ///
    /// # 参数
    /// - path: 点分路径
    /// - default: 缺失（或节点无文本）时的返回值
    /// - cast: 仅在取到文本时调用
    pub fn value_at<T, E>(
        &self,
        path: &str,
        default: T,
        cast: impl FnOnce(&str) -> Result<T, E>,
    ) -> Result<T, E> {
        match self.text_at(path) {
            Some(text) => cast(text),
            None => Ok(default),
        }
    }

    /// 路径末段的全部同名节点（如 `MarkList.Mark` → 全部 `<Mark>`）
    pub fn children_at<'a>(&'a self, path: &'a str) -> Vec<&'a XmlNode> {
        let (parent_path, leaf) = match path.rsplit_once('.') {
            Some((parent, leaf)) => (Some(parent), leaf),
            None => (None, path),
        };
        let parent = match parent_path {
            Some(p) => self.find_path(p),
            None => Some(self),
        };
        parent
            .map(|p| p.children_named(leaf).collect())
            .unwrap_or_default()
    }
}

// ==========================================
// 子树构建
// ==========================================

fn local_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}

/// 单个实体引用 → 文本
fn push_reference(text: &mut String, reference: &BytesRef<'_>) {
    if let Some(c) = reference.resolve_char_ref().ok().flatten() {
        text.push(c);
        return;
    }
    let name = String::from_utf8_lossy(reference);
    match resolve_predefined_entity(&name) {
        Some(value) => text.push_str(value),
        None => {
            text.push('&');
            text.push_str(&name);
            text.push(';');
        }
    }
}

/// 构建中的节点（文本分段累积）
struct PendingNode {
    node: XmlNode,
    text: String,
}

impl PendingNode {
    fn new(name: String) -> Self {
        Self {
            node: XmlNode::new(name),
            text: String::new(),
        }
    }

    fn finish(mut self) -> XmlNode {
        let text = self.text.trim();
        if !text.is_empty() {
            self.node.text = Some(text.to_string());
        }
        self.node
    }
}

/// 读取当前起始标签对应的完整子树（读取器位于起始标签之后）
fn read_subtree<R: BufRead>(
    reader: &mut Reader<R>,
    buf: &mut Vec<u8>,
    root_name: String,
) -> ImportResult<XmlNode> {
    let mut stack = vec![PendingNode::new(root_name)];

    loop {
        buf.clear();
        match reader.read_event_into(buf)? {
            Event::Start(e) => {
                stack.push(PendingNode::new(local_name(e.local_name().as_ref())));
            }
            Event::Empty(e) => {
                let leaf = XmlNode::new(local_name(e.local_name().as_ref()));
                if let Some(top) = stack.last_mut() {
                    top.node.children.push(leaf);
                }
            }
            Event::Text(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::CData(e) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(e.as_ref()));
                }
            }
            Event::GeneralRef(e) => {
                if let Some(top) = stack.last_mut() {
                    push_reference(&mut top.text, &e);
                }
            }
            Event::End(_) => {
                let finished = match stack.pop() {
                    Some(pending) => pending.finish(),
                    None => {
                        return Err(ImportError::XmlParseError("多余的结束标签".to_string()))
                    }
                };
                match stack.last_mut() {
                    Some(parent) => parent.node.children.push(finished),
                    None => return Ok(finished),
                }
            }
            Event::Eof => {
                return Err(ImportError::XmlParseError(
                    "条目未闭合即到达文件结尾".to_string(),
                ))
            }
            _ => {}
        }
    }
}

/// 从字符串解析整棵树（测试与小文档用）
pub fn parse_document(xml: &str) -> ImportResult<XmlNode> {
    let mut reader = Reader::from_reader(xml.as_bytes());
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let root_name = loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => break local_name(e.local_name().as_ref()),
            Event::Empty(e) => return Ok(XmlNode::new(local_name(e.local_name().as_ref()))),
            Event::Eof => return Err(ImportError::XmlParseError("文档没有根元素".to_string())),
            _ => {}
        }
    };
    read_subtree(&mut reader, &mut buf, root_name)
}

// ==========================================
// 根标签嗅探
// ==========================================

/// 读取根元素本地名（只解析到第一个元素）
pub fn sniff_root_tag(path: &Path) -> ImportResult<Option<String>> {
    if !path.exists() {
        return Err(ImportError::FileNotFound(path.display().to_string()));
    }
    let mut reader = Reader::from_reader(BufReader::new(File::open(path)?));
    let mut buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) | Event::Empty(e) => {
                return Ok(Some(local_name(e.local_name().as_ref())));
            }
            Event::Eof => return Ok(None),
            _ => {}
        }
    }
}

// ==========================================
// ItemStream - 条目流
// ==========================================
pub struct ItemStream<R> {
    reader: Reader<R>,
    buf: Vec<u8>,
    list_tag: String,
    item_tag: String,
    list_depth: usize,
    finished: bool,
}

impl ItemStream<BufReader<File>> {
    /// 打开 XML 文件并按 `<list_tag>/<item_tag>` 约定读取条目
    pub fn open(path: &Path, list_tag: &str, item_tag: &str) -> ImportResult<Self> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), list_tag, item_tag))
    }
}

impl<R: BufRead> ItemStream<R> {
    pub fn from_reader(source: R, list_tag: &str, item_tag: &str) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false); // 文本在节点收尾时统一去空白
        Self {
            reader,
            buf: Vec::new(),
            list_tag: list_tag.to_string(),
            item_tag: item_tag.to_string(),
            list_depth: 0,
            finished: false,
        }
    }

    fn next_item(&mut self) -> ImportResult<Option<XmlNode>> {
        let item_name = loop {
            self.buf.clear();
            match self.reader.read_event_into(&mut self.buf)? {
                Event::Start(e) => {
                    let name = local_name(e.local_name().as_ref());
                    if name == self.list_tag {
                        self.list_depth += 1;
                    } else if self.list_depth > 0 && name == self.item_tag {
                        break name;
                    }
                }
                Event::Empty(e) => {
                    let name = local_name(e.local_name().as_ref());
                    if self.list_depth > 0 && name == self.item_tag {
                        return Ok(Some(XmlNode::new(name)));
                    }
                }
                Event::End(e) => {
                    if self.list_depth > 0 && e.local_name().as_ref() == self.list_tag.as_bytes() {
                        self.list_depth -= 1;
                    }
                }
                Event::Eof => return Ok(None),
                _ => {}
            }
        };
        read_subtree(&mut self.reader, &mut self.buf, item_name).map(Some)
    }
}

impl<R: BufRead> Iterator for ItemStream<R> {
    type Item = ImportResult<XmlNode>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_item() {
            Ok(Some(item)) => Some(Ok(item)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
