// Transfer handles and their reconstruction from listings
//
// Listing calls return plain JSON records. [`TransferRegistry`] turns each
// record into a [`Transfer`], resolving its sender once: a record sent by
// the current user points back at that user, anything else keeps the
// sender name as given.

use std::sync::{Arc, Weak};

use serde_json::{Map, Value};
use tracing::debug;

use crate::api::{ApiResponse, Operation, Transport};
use crate::errors::{Error, Result};
use crate::session::Credentials;
use crate::user::User;

/// Status the service reports for a finished transfer.
pub const STATUS_COMPLETE: &str = "STATUS_COMPLETE";

/// Identity shared by a `User` and the transfers that point back at it.
#[derive(Debug, PartialEq, Eq)]
pub struct Identity {
    username: String,
}

impl Identity {
    pub(crate) fn new(username: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            username: username.into(),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Sender of a transfer.
#[derive(Clone, Debug)]
pub enum Owner {
    /// The user that listed the transfer. Held weakly, the user owns its
    /// transfers and not the other way round.
    Local(Weak<Identity>),
    /// Any other sender, by the identifier the service reported.
    Remote(String),
}

impl Owner {
    pub fn is_local(&self) -> bool {
        matches!(self, Owner::Local(_))
    }

    /// Whether this owner is exactly `user`.
    pub fn is_user(&self, user: &User) -> bool {
        match self {
            Owner::Local(identity) => std::ptr::eq(identity.as_ptr(), Arc::as_ptr(user.identity())),
            Owner::Remote(_) => false,
        }
    }

    /// Sender name, if the local user is still around.
    pub fn name(&self) -> Option<String> {
        match self {
            Owner::Local(identity) => identity.upgrade().map(|id| id.username().to_string()),
            Owner::Remote(name) => Some(name.clone()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Transfer {
    owner: Owner,
    info: Map<String, Value>,
    files: Vec<Value>,
    restored: bool,
}

impl Transfer {
    /// A fresh outbound transfer that has not been sent yet.
    pub fn new(owner: Owner) -> Self {
        Self {
            owner,
            info: Map::new(),
            files: Vec::new(),
            restored: false,
        }
    }

    /// A transfer rebuilt from a record the service already knows about.
    pub fn restore(owner: Owner, info: Map<String, Value>) -> Self {
        Self {
            owner,
            info,
            files: Vec::new(),
            restored: true,
        }
    }

    pub fn owner(&self) -> &Owner {
        &self.owner
    }

    pub fn info(&self) -> &Map<String, Value> {
        &self.info
    }

    pub fn files(&self) -> &[Value] {
        &self.files
    }

    pub fn is_restored(&self) -> bool {
        self.restored
    }

    pub fn id(&self) -> Option<&str> {
        self.info.get("transferid").and_then(Value::as_str)
    }

    pub fn status(&self) -> Option<&str> {
        self.info.get("status").and_then(Value::as_str)
    }

    pub fn is_complete(&self) -> bool {
        self.status() == Some(STATUS_COMPLETE)
    }

    pub fn mark_complete(&mut self) {
        self.info
            .insert("status".into(), Value::String(STATUS_COMPLETE.into()));
    }

    /// Fetch the file listing of this transfer from the service.
    pub fn fetch_files(&mut self, transport: &dyn Transport, credentials: Credentials<'_>) -> Result<()> {
        let id = self.id().ok_or_else(|| Error::InvalidArgument {
            reason: "transfer has no transferid".into(),
        })?;
        let params = credentials.params().with("transferid", id);

        let mut res = transport.call(Operation::TransferGet, &params)?;
        if !res.is_success() {
            return Err(res.into_error());
        }
        let transfer = res.take_field(Operation::TransferGet, "transfer")?;
        self.files = match transfer.get("files") {
            Some(Value::Array(files)) => files.clone(),
            _ => {
                return Err(Error::MalformedResponse {
                    operation: Operation::TransferGet.name(),
                    reason: "missing field `transfer.files`".into(),
                })
            }
        };
        Ok(())
    }
}

/// Rebuilds transfers from a listing response on behalf of one user.
pub struct TransferRegistry<'a> {
    identity: &'a Arc<Identity>,
    transport: &'a dyn Transport,
    credentials: Credentials<'a>,
}

impl<'a> TransferRegistry<'a> {
    pub fn new(
        identity: &'a Arc<Identity>,
        transport: &'a dyn Transport,
        credentials: Credentials<'a>,
    ) -> Self {
        Self {
            identity,
            transport,
            credentials,
        }
    }

    /// Resolve the sender of one record.
    fn owner_for(&self, from: &str) -> Owner {
        if from == self.identity.username() {
            Owner::Local(Arc::downgrade(self.identity))
        } else {
            Owner::Remote(from.to_string())
        }
    }

    /// Turn the `transfers` list of `response` into transfers, in the order
    /// the service returned them, fetching each one's file listing.
    pub fn restore(&self, operation: Operation, mut response: ApiResponse) -> Result<Vec<Transfer>> {
        let malformed = |reason: String| Error::MalformedResponse {
            operation: operation.name(),
            reason,
        };

        let records = match response.take_field(operation, "transfers")? {
            Value::Array(records) => records,
            other => return Err(malformed(format!("`transfers` is not a list: {other}"))),
        };

        let mut transfers = Vec::with_capacity(records.len());
        for record in records {
            let Value::Object(info) = record else {
                return Err(malformed("transfer record is not an object".into()));
            };
            let owner = match info.get("from") {
                Some(Value::String(from)) => self.owner_for(from),
                _ => return Err(malformed("transfer record without `from`".into())),
            };

            let mut transfer = Transfer::restore(owner, info);
            transfer.fetch_files(self.transport, self.credentials)?;
            transfers.push(transfer);
        }
        debug!(operation = operation.name(), count = transfers.len(), "restored transfers");
        Ok(transfers)
    }
}
