mod app;
mod settings;
mod surface;
mod workers;

use app::App;

fn main() -> iced::Result {
    env_logger::init();

    iced::application(App::new, App::update, App::view)
        .title("DetectView")
        .subscription(App::subscription)
        .window(iced::window::Settings {
            size: iced::Size::new(700.0, 660.0),
            ..Default::default()
        })
        .run()
}
