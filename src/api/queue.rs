use crate::transport::request::Request;
use crate::{Error, QueueItem, QueueItemId};

fn item_request(id: QueueItemId) -> Request {
    let id = id.to_string();
    Request::get(["queue", "item", id.as_str(), "api", "json"])
}

/// Jenkins queue APIs (blocking).
#[derive(Clone)]
pub struct BlockingQueueService {
    client: crate::BlockingClient,
}

impl BlockingQueueService {
    pub(crate) fn new(client: crate::BlockingClient) -> Self {
        Self { client }
    }
}

impl BlockingQueueService {
    /// `GET /queue/item/<id>/api/json`
    pub fn item(&self, id: QueueItemId) -> Result<QueueItem, Error> {
        self.client.send_json(item_request(id))
    }

    /// `GET /queue/item/<id>/api/json`, mapping `404` to `None`.
    ///
    /// Jenkins drops queue items some time after they were scheduled or
    /// cancelled, so a poller has to expect the item to vanish.
    pub fn find_item(&self, id: QueueItemId) -> Result<Option<QueueItem>, Error> {
        match self.item(id) {
            Ok(item) => Ok(Some(item)),
            Err(Error::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }
}
