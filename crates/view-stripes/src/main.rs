mod logging;
mod settings;

use settings::Settings;
use std::process::ExitCode;
use view_stripes_lib::{ResolutionStripe, StripeFactory, ViewPoint, create_request_boxes};

fn main() -> ExitCode {
    logging::setup_logging();
    let settings = Settings::from_cli();
    tracing::debug!(?settings, "Parsed settings");

    let config = settings.partition_config();
    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        return ExitCode::FAILURE;
    }

    let view_point = match ViewPoint::new(&settings.view_point_params()) {
        Ok(view_point) => view_point,
        Err(e) => {
            tracing::error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let request = settings.view_request();
    let stripes = if settings.stripes_only {
        StripeFactory::new(
            &view_point,
            config.min_scale_resolution(),
            config.max_request_size,
        )
        .create_resolution_stripes(request.image_width, request.minimal_height, request.scale)
    } else {
        create_request_boxes(&view_point, &request, &config)
    };

    if stripes.is_empty() {
        tracing::warn!("The view produced no request regions");
    }
    for stripe in &stripes {
        println!("{}", format_stripe(stripe));
    }
    ExitCode::SUCCESS
}

/// One tab separated line: min resolution, max resolution, request size and WKT
fn format_stripe(stripe: &ResolutionStripe) -> String {
    let size = match (stripe.request_width_for_bbox(), stripe.request_height_for_bbox()) {
        (Some(width), Some(height)) => format!("{width}x{height}"),
        _ => "invalid".to_string(),
    };
    format!(
        "{:.6}\t{:.6}\t{}\t{}",
        stripe.min_resolution(),
        stripe.max_resolution(),
        size,
        stripe.to_wkt()
    )
}
