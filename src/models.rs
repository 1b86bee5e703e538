use serde::Serialize;

// a file in the shared folder
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    pub name: String,
    pub size: u64,
    pub modified: String,
}

// response for file listing endpoint
#[derive(Serialize, Debug)]
pub struct FileListResponse {
    pub files: Vec<FileInfo>,
    pub total: usize,
}
