//! In-memory gateway for unit tests

use common::{ApiResult, ClientError};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use crate::gateway::{AuthGateway, TaskGateway};
use crate::models::{
    AuthContext, AuthPayload, LoginRequest, NewTask, SignupRequest, Task, TaskUpdate, User,
};

pub fn user(id: &str) -> User {
    User {
        id: id.to_string(),
        email: format!("{id}@example.com"),
        name: None,
    }
}

pub fn task(id: i64, title: &str, completed: bool) -> Task {
    Task {
        id,
        title: title.to_string(),
        description: None,
        completed,
        owner: "u1".to_string(),
        created_at: None,
        updated_at: None,
    }
}

/// Scripted answer to one gateway call
#[derive(Debug, Clone)]
pub enum Reply {
    Auth(&'static str, User),
    User(User),
    Task(Task),
    Tasks(Vec<Task>),
    Done,
    Fail(ClientError),
}

/// Gateway answering from per-operation queues and recording every call
///
/// Keys are the operation name (`login`, `list`, `create`, ...) or, for
/// per-task operations, the name and id (`toggle 5`). An empty queue
/// answers with a 500.
#[derive(Default)]
pub struct FakeGateway {
    replies: Mutex<HashMap<String, VecDeque<(usize, Reply)>>>,
    calls: Mutex<Vec<String>>,
}

impl FakeGateway {
    pub fn script(&self, key: &str, reply: Reply) {
        self.script_delayed(key, 0, reply);
    }

    /// Queue a reply that yields to the runtime `yields` times before answering
    pub fn script_delayed(&self, key: &str, yields: usize, reply: Reply) {
        self.replies
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_default()
            .push_back((yields, reply));
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    async fn answer(&self, key: &str, call: String) -> ApiResult<Reply> {
        self.calls.lock().unwrap().push(call);
        let next = self
            .replies
            .lock()
            .unwrap()
            .get_mut(key)
            .and_then(VecDeque::pop_front);

        let (yields, reply) = next.unwrap_or((
            0,
            Reply::Fail(ClientError::Server {
                status: 500,
                message: format!("no reply scripted for {key}"),
            }),
        ));
        for _ in 0..yields {
            tokio::task::yield_now().await;
        }

        match reply {
            Reply::Fail(e) => Err(e),
            other => Ok(other),
        }
    }
}

impl AuthGateway for FakeGateway {
    async fn login(&self, request: &LoginRequest) -> ApiResult<AuthPayload> {
        match self.answer("login", format!("login {}", request.email)).await? {
            Reply::Auth(token, user) => Ok(AuthPayload {
                token: token.to_string(),
                user,
            }),
            other => panic!("unexpected login reply {other:?}"),
        }
    }

    async fn signup(&self, request: &SignupRequest) -> ApiResult<AuthPayload> {
        match self.answer("signup", format!("signup {}", request.email)).await? {
            Reply::Auth(token, user) => Ok(AuthPayload {
                token: token.to_string(),
                user,
            }),
            other => panic!("unexpected signup reply {other:?}"),
        }
    }

    async fn profile(&self, token: &str) -> ApiResult<User> {
        match self.answer("profile", format!("profile {token}")).await? {
            Reply::User(user) => Ok(user),
            other => panic!("unexpected profile reply {other:?}"),
        }
    }

    async fn logout(&self, token: &str) -> ApiResult<()> {
        self.answer("logout", format!("logout {token}")).await.map(|_| ())
    }
}

impl TaskGateway for FakeGateway {
    async fn list_tasks(&self, auth: &AuthContext) -> ApiResult<Vec<Task>> {
        let call = format!("list {} {}", auth.user_id, auth.token);
        match self.answer("list", call).await? {
            Reply::Tasks(tasks) => Ok(tasks),
            other => panic!("unexpected list reply {other:?}"),
        }
    }

    async fn create_task(&self, _auth: &AuthContext, task: &NewTask) -> ApiResult<Task> {
        match self.answer("create", format!("create {}", task.title)).await? {
            Reply::Task(task) => Ok(task),
            other => panic!("unexpected create reply {other:?}"),
        }
    }

    async fn update_task(
        &self,
        _auth: &AuthContext,
        id: i64,
        _changes: &TaskUpdate,
    ) -> ApiResult<Task> {
        let key = format!("update {id}");
        match self.answer(&key, key.clone()).await? {
            Reply::Task(task) => Ok(task),
            other => panic!("unexpected update reply {other:?}"),
        }
    }

    async fn toggle_task(&self, _auth: &AuthContext, id: i64) -> ApiResult<Task> {
        let key = format!("toggle {id}");
        match self.answer(&key, key.clone()).await? {
            Reply::Task(task) => Ok(task),
            other => panic!("unexpected toggle reply {other:?}"),
        }
    }

    async fn delete_task(&self, _auth: &AuthContext, id: i64) -> ApiResult<()> {
        let key = format!("delete {id}");
        match self.answer(&key, key.clone()).await? {
            Reply::Done => Ok(()),
            other => panic!("unexpected delete reply {other:?}"),
        }
    }
}
