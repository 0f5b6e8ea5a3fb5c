//! 建立连接时的资源回滚
//!
//! 每获得一个驱动资源就登记到守卫中；守卫在 `commit()` 之前被丢弃时，
//! 按获得顺序的逆序释放全部资源。

use pcanlink_can::CanApi;
use pcanlink_protocol::{ClientHandle, NetHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Acquired {
    Client(ClientHandle),
    Connection(ClientHandle, NetHandle),
}

pub(crate) struct SetupGuard<'a> {
    api: &'a dyn CanApi,
    acquired: Vec<Acquired>,
}

impl<'a> SetupGuard<'a> {
    pub(crate) fn new(api: &'a dyn CanApi) -> Self {
        Self {
            api,
            acquired: Vec::with_capacity(2),
        }
    }

    pub(crate) fn client(&mut self, client: ClientHandle) {
        self.acquired.push(Acquired::Client(client));
    }

    pub(crate) fn connection(&mut self, client: ClientHandle, net: NetHandle) {
        self.acquired.push(Acquired::Connection(client, net));
    }

    /// 全部步骤成功，资源所有权转交给会话
    pub(crate) fn commit(mut self) {
        self.acquired.clear();
    }
}

impl Drop for SetupGuard<'_> {
    fn drop(&mut self) {
        while let Some(resource) = self.acquired.pop() {
            debug!("Setup failed, releasing {:?}", resource);
            let result = match resource {
                Acquired::Connection(client, net) => self.api.disconnect_from_net(client, net),
                Acquired::Client(client) => self.api.remove_client(client),
            };
            if let Err(e) = result {
                warn!("Failed to release {:?}: {}", resource, e);
            }
        }
    }
}
