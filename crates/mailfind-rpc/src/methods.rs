//! RPC method definitions using jsonrpsee

use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;

use crate::error::RpcError;
use crate::types::*;

/// Remote search index API
#[rpc(server, client, namespace = "mailfind")]
pub trait MailfindApi {
    /// Execute one search
    #[method(name = "search")]
    async fn search(&self, request: SearchRequest) -> Result<SearchResponse, ErrorObjectOwned>;
}

/// Convert an RPC error into a JSON-RPC error object
pub fn to_rpc_error(e: RpcError) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(e.code(), e.to_string(), None::<()>)
}
