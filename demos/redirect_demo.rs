//! Redirect Demo
//!
//! Runs a host with an auth guard, a page-timing middleware and a title
//! middleware, then prints the onion order and the redirect chain.
//!
//! Run with `RUST_LOG=debug cargo run --example redirect_demo` to see the
//! engine log as well.

use std::cell::RefCell;
use std::rc::Rc;

use spa_navigator::{
    middleware_fn, Environment, FnMiddleware, MemoryEnvironment, NavigationContext,
    NavigationHost,
};

// ============================================================================
// Middleware
// ============================================================================

type Trace = Rc<RefCell<Vec<String>>>;

/// Sends `/admin/*` to `/login` until a `user` is present in the data bag.
fn auth(trace: &Trace) -> FnMiddleware {
    let trace = trace.clone();
    middleware_fn("auth").on_navigate(move |cx, next| {
        let trace = trace.clone();
        async move {
            if cx.path().starts_with("/admin") && cx.get("user").is_none() {
                trace.borrow_mut().push(format!("auth: {} -> /login", cx.path()));
                cx.redirect("/login").await?;
                return Ok(());
            }
            next.run().await
        }
    })
}

/// Records entry and exit around the rest of the chain.
fn timing(trace: &Trace) -> FnMiddleware {
    let trace = trace.clone();
    middleware_fn("timing").on_navigate(move |cx, next| {
        let trace = trace.clone();
        async move {
            trace.borrow_mut().push(format!("timing: enter {}", cx.path()));
            let result = next.run().await;
            trace.borrow_mut().push(format!("timing: leave {}", cx.path()));
            result
        }
    })
}

fn title() -> FnMiddleware {
    middleware_fn("title").on_navigate(|cx, next| async move {
        next.run().await?;
        cx.insert("title", format!("Page {}", cx.path()));
        Ok(())
    })
}

// ============================================================================
// Main
// ============================================================================

fn describe(cx: &NavigationContext) -> String {
    let mut chain = vec![format!("#{} {}", cx.index(), cx.path())];
    let mut parent = cx.parent();
    while let Some(cx) = parent {
        chain.push(format!("#{} {}", cx.index(), cx.path()));
        parent = cx.parent();
    }
    chain.join(" <- ")
}

fn main() -> spa_navigator::Result<()> {
    let _ = env_logger::try_init();

    let env = Rc::new(MemoryEnvironment::from_url("https://app.test/")?);
    let host = NavigationHost::new(env.clone());
    let trace = Trace::default();

    host.register(timing(&trace))?;
    host.register(auth(&trace))?;
    host.register(title())?;

    pollster::block_on(async {
        host.run(Default::default(), ()).await?;

        for target in ["/docs", "/admin/users"] {
            trace.borrow_mut().clear();
            let settled = host.nav(target).await?;

            println!("nav({target})");
            for line in trace.borrow().iter() {
                println!("  {line}");
            }
            println!("  settled: {}", describe(&settled));
            println!(
                "  title:   {}",
                settled.get("title").unwrap_or_default()
            );
        }
        Ok::<_, spa_navigator::NavigationError>(())
    })?;

    println!("history: {:?}", env.history());
    println!("showing: {}", env.location());
    Ok(())
}
