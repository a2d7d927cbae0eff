//! Client transport: one TCP listener accepting sessions, one task per
//! admitted session. A session classifies each line as a query (answered
//! inline from the current committed snapshot) or an edit (enqueued for
//! the next tick), and interleaves those reads with delivering broadcast
//! deltas pushed onto its outbound channel.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use crate::context::ServerContext;

/// Bind and accept sessions until the listener errors. Each accepted
/// connection is handed its own task so one slow or misbehaving client
/// never blocks another.
pub async fn serve(ctx: Arc<ServerContext>, bind: &str) -> anyhow::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    tracing::info!(bind, "transport listening");
    // Printed to stdout, not logged: the external process supervisor
    // consumes this line as the transport-ready signal.
    println!("LISTENING {bind}");

    loop {
        let (stream, peer) = listener.accept().await?;
        let ctx = Arc::clone(&ctx);
        tokio::spawn(async move {
            if let Err(error) = handle_session(ctx, stream).await {
                tracing::warn!(%peer, %error, "session ended with error");
            }
        });
    }
}

async fn handle_session(ctx: Arc<ServerContext>, stream: TcpStream) -> anyhow::Result<()> {
    let (read_half, mut write_half) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    let user = match lines.next_line().await? {
        Some(line) => line.trim().to_string(),
        None => return Ok(()),
    };

    let (outbound_tx, mut outbound_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    let (slot, permission) = match ctx.registry.admit(&user, &ctx.roles, outbound_tx) {
        Ok(admitted) => admitted,
        Err(error) => {
            write_half.write_all(format!("{error}\n").as_bytes()).await?;
            return Ok(());
        }
    };

    {
        let document = ctx.document.read().await;
        let body = document.flatten();
        let bootstrap = format!(
            "{permission}\n{version}\n{len}\n",
            version = document.version(),
            len = body.len()
        );
        write_half.write_all(bootstrap.as_bytes()).await?;
        write_half.write_all(&body).await?;
    }

    loop {
        tokio::select! {
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) if line == "DISCONNECT" => break,
                    Ok(Some(line)) => {
                        if let Some(response) = answer_query(&ctx, &line, permission).await {
                            if write_half.write_all(response.as_bytes()).await.is_err() {
                                break;
                            }
                        } else {
                            ctx.queue.enqueue(user.as_str(), line);
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            }
            delta = outbound_rx.recv() => {
                match delta {
                    Some(delta) => {
                        if write_half.write_all(delta.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    ctx.registry.release(slot);
    let document = ctx.document.write().await;
    if let Err(error) = ctx.snapshot.write(&document) {
        tracing::warn!(%error, "failed to write snapshot on disconnect");
    }
    Ok(())
}

/// `DOC?` / `PERM?` / `LOG?` are answered directly, never enqueued.
/// Returns `None` for any other line, which the caller then treats as a
/// mutator command to enqueue.
async fn answer_query(
    ctx: &ServerContext,
    line: &str,
    permission: crate::role::Permission,
) -> Option<String> {
    match line {
        "DOC?" => {
            let document = ctx.document.read().await;
            let text = document.flatten_string();
            Some(format!("DOC?\n{text}\n"))
        }
        "PERM?" => Some(format!("PERM?\n{permission}\n")),
        "LOG?" => {
            let log = ctx.audit.read_all().unwrap_or_default();
            Some(format!("LOG?\n{log}"))
        }
        _ => None,
    }
}
