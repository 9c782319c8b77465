use mongodb::{error::Error as DbError, Client, ClientSession};

/// An open MongoDB transaction.
///
/// Every write made through [`Txn::session`] becomes visible on [`Txn::commit`],
/// or not at all. Dropping an uncommitted `Txn` aborts it, but callers should
/// [`Txn::rollback`] explicitly so failures are observed.
pub struct Txn {
    session: ClientSession,
}

impl Txn {
    /// Start a session on the given client and open a transaction in it.
    pub async fn begin(client: &Client) -> Result<Self, DbError> {
        let mut session = client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(Self { session })
    }

    /// The session the transaction's statements must run in.
    pub fn session(&mut self) -> &mut ClientSession {
        &mut self.session
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        self.session.commit_transaction().await
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        self.session.abort_transaction().await
    }
}
