use actix_web::{web, HttpResponse};

use crate::python::InvokerStatsSnapshot;
use crate::state::AppState;

fn render(stats: &InvokerStatsSnapshot) -> String {
    format!(
        "# HELP script_runs_started_total Script runs that acquired a worker slot\n\
         # TYPE script_runs_started_total counter\n\
         script_runs_started_total {}\n\
         \n\
         # HELP script_runs_succeeded_total Script runs that produced a result\n\
         # TYPE script_runs_succeeded_total counter\n\
         script_runs_succeeded_total {}\n\
         \n\
         # HELP script_runs_failed_total Script runs that failed, timeouts and cancellations included\n\
         # TYPE script_runs_failed_total counter\n\
         script_runs_failed_total {}\n\
         \n\
         # HELP script_runs_timed_out_total Script runs killed after the timeout\n\
         # TYPE script_runs_timed_out_total counter\n\
         script_runs_timed_out_total {}\n\
         \n\
         # HELP script_runs_rejected_total Script runs refused because the pool was saturated\n\
         # TYPE script_runs_rejected_total counter\n\
         script_runs_rejected_total {}\n\
         \n\
         # HELP script_runs_in_flight Script processes currently running\n\
         # TYPE script_runs_in_flight gauge\n\
         script_runs_in_flight {}\n\
         \n\
         # HELP script_runs_queued Script runs waiting for a worker slot\n\
         # TYPE script_runs_queued gauge\n\
         script_runs_queued {}\n",
        stats.started,
        stats.succeeded,
        stats.failed,
        stats.timed_out,
        stats.rejected,
        stats.in_flight,
        stats.queued
    )
}

#[utoipa::path(
    get,
    path = "/metrics",
    tag = "Health",
    responses(
        (status = 200, description = "Script pool metrics in Prometheus text format", body = String)
    )
)]
pub async fn get_metrics(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; version=0.0.4")
        .body(render(&state.invoker.stats()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_lists_every_counter() {
        let stats = InvokerStatsSnapshot {
            started: 3,
            succeeded: 2,
            failed: 1,
            timed_out: 0,
            rejected: 4,
            in_flight: 0,
            queued: 0,
        };
        let text = render(&stats);

        assert!(text.contains("script_runs_started_total 3"));
        assert!(text.contains("script_runs_rejected_total 4"));
        assert!(text.contains("# TYPE script_runs_in_flight gauge"));
    }
}
