pub mod dbdocs;
pub mod memdocs;
pub mod mokacache;
pub mod rediscache;
