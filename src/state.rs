use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinSet;

use crate::config::Config;
use crate::mail::MailSender;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub mailer: Arc<dyn MailSender>,
    pub background: Arc<BackgroundTasks>,
}

impl AppState {
    pub fn new(config: Config, mailer: Arc<dyn MailSender>) -> Self {
        Self {
            config: Arc::new(config),
            mailer,
            background: Arc::new(BackgroundTasks::default()),
        }
    }
}

/// Work that outlives the request that started it, awaited on shutdown
#[derive(Default)]
pub struct BackgroundTasks {
    tasks: Mutex<JoinSet<()>>,
}

impl BackgroundTasks {
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        // reap finished tasks so the set only holds in-flight work
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of tasks that have not been reaped yet
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait until every spawned task has finished
    pub async fn drain(&self) {
        loop {
            let mut tasks = std::mem::take(
                &mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner),
            );
            if tasks.is_empty() {
                return;
            }

            while let Some(result) = tasks.join_next().await {
                if let Err(e) = result {
                    tracing::error!(error = %e, "Background task failed");
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn test_state(
    environment: crate::config::Environment,
    dispatch_policy: crate::config::DispatchPolicy,
    mailer: Arc<dyn MailSender>,
) -> AppState {
    use crate::config::TransportConfig;

    let config = Config {
        server_host: "127.0.0.1".to_string(),
        server_port: 5000,
        environment,
        dispatch_policy,
        transport: TransportConfig::Smtp {
            host: "smtp.gmail.com".to_string(),
            port: 587,
            username: "noreply@sobrio30.it".to_string(),
            password: "app-password".to_string(),
        },
        mail_from: "noreply@sobrio30.it".to_string(),
        mail_receiver: "rivenditori@sobrio30.it".to_string(),
        subject_prefix: "Richiesta rivenditore Sobrio30".to_string(),
        json_logs: false,
    };

    AppState::new(config, mailer)
}
