//! Plain-text views for the command line.

use busline_catalog::{seats::seats_left_ratio, FareQuote, SeatMap, SeatState};
use busline_core::stats::{
    clamp_percent, format_duration, format_money, format_percent, revenue_split,
};
use busline_order::{BookingState, CheckoutOutcome, TrackedBooking};
use busline_shared::{AdminStats, Booking, Trip, User};
use std::fmt::Write;

const SEATS_PER_ROW: usize = 4;
const BAR_WIDTH: usize = 20;

fn bar(ratio: f64) -> String {
    let filled = (ratio.clamp(0.0, 1.0) * BAR_WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(BAR_WIDTH - filled))
}

/// One line per trip for listings
pub fn trip_line(trip: &Trip) -> String {
    let availability = if !trip.is_active {
        "inactive".to_string()
    } else if trip.is_sold_out() {
        "SOLD OUT".to_string()
    } else {
        format!("{}/{} seats", trip.seats_available, trip.total_seats)
    };
    format!(
        "{}  {} ({})  {} -> {}  {}  {}  {}",
        trip.id,
        trip.bus_name,
        trip.bus_number,
        trip.origin().name,
        trip.destination().name,
        trip.starts_at.format("%d %b %H:%M"),
        format_duration(trip.duration()),
        availability
    )
}

pub fn trip_detail(trip: &Trip) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} ({})", trip.bus_name, trip.bus_number);
    if let Some(name) = &trip.name {
        let _ = writeln!(out, "Operator: {}", name);
    }
    let _ = writeln!(
        out,
        "Departs {}  Arrives {}  ({})",
        trip.starts_at.format("%Y-%m-%d %H:%M"),
        trip.ends_at.format("%Y-%m-%d %H:%M"),
        format_duration(trip.duration())
    );
    let mut amenities = Vec::new();
    if trip.amenities.has_ac {
        amenities.push("AC");
    }
    if trip.amenities.has_wifi {
        amenities.push("WiFi");
    }
    if !amenities.is_empty() {
        let _ = writeln!(out, "Amenities: {}", amenities.join(", "));
    }
    let _ = writeln!(out, "Stops:");
    for (i, stop) in trip.stops.iter().enumerate() {
        let _ = writeln!(out, "  {}. {}  {}", i + 1, stop.name, format_money(stop.fare));
    }
    let _ = writeln!(
        out,
        "Seats left: {} of {} {}",
        trip.seats_available,
        trip.total_seats,
        bar(seats_left_ratio(trip))
    );
    out
}

/// Seat grid, `SEATS_PER_ROW` to a row. Booked seats show as `XX`,
/// selected ones in angle brackets.
pub fn seat_grid(map: &SeatMap) -> String {
    let mut out = String::new();
    for row in map.rows(SEATS_PER_ROW) {
        let cells: Vec<String> = row
            .iter()
            .map(|(n, state)| match state {
                SeatState::Booked => "[XX]".to_string(),
                SeatState::Selected => format!("<{:>2}>", n),
                SeatState::Available => format!("[{:>2}]", n),
            })
            .collect();
        let _ = writeln!(out, "{}", cells.join(" "));
    }
    out
}

pub fn quote_summary(quote: &FareQuote) -> String {
    let seats = if quote.seats.is_empty() {
        format!("{} seat(s)", quote.seat_count)
    } else {
        let numbers: Vec<String> = quote.seats.iter().map(|s| s.to_string()).collect();
        format!("seats {}", numbers.join(", "))
    };
    format!(
        "{} -> {}, {} at {} each: {}",
        quote.from,
        quote.to,
        seats,
        format_money(quote.per_seat),
        format_money(quote.total)
    )
}

pub fn booking_line(booking: &Booking) -> String {
    let seats = if booking.seats.is_empty() {
        format!("{} seat(s)", booking.seat_count)
    } else {
        let numbers: Vec<String> = booking.seats.iter().map(|s| s.to_string()).collect();
        format!("seats {}", numbers.join(","))
    };
    let departs = booking
        .trip
        .starts_at
        .map(|t| t.format("%d %b %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}  {} {} -> {}  {}  {}  {}  {} ({})",
        booking.id,
        booking.trip.bus_name,
        booking.from,
        booking.to,
        departs,
        seats,
        format_money(booking.total_fare),
        booking.payment_method,
        booking.payment_status
    )
}

/// Booking line prefixed with its lifecycle state
pub fn tracked_line(tracked: &TrackedBooking) -> Option<String> {
    tracked
        .record
        .as_ref()
        .map(|b| format!("{:<10} {}", tracked.state.label(), booking_line(b)))
}

/// Booking line for admin listings, with the rider's name
pub fn admin_booking_line(booking: &Booking) -> String {
    let rider = booking
        .user
        .as_ref()
        .map(|u| match &u.email {
            Some(email) => format!("{} <{}>", u.name, email),
            None => u.name.clone(),
        })
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{:<10} {}  {}",
        BookingState::from_record(booking).label(),
        booking_line(booking),
        rider
    )
}

pub fn user_line(user: &User) -> String {
    format!(
        "{}  {}  {:<24} {}",
        user.initial(),
        user.name,
        user.email.as_deref().unwrap_or("-"),
        user.role
    )
}

pub fn ticket(outcome: &CheckoutOutcome) -> String {
    let booking = &outcome.booking;
    let mut out = String::new();
    let _ = writeln!(out, "==== BOOKING {} ====", booking.id);
    let _ = writeln!(out, "Bus:      {} ({})", booking.trip.bus_name, booking.trip.bus_number);
    let _ = writeln!(out, "Route:    {} -> {}", outcome.quote.from, outcome.quote.to);
    if let Some(start) = booking.trip.starts_at {
        let _ = writeln!(out, "Departs:  {}", start.format("%Y-%m-%d %H:%M"));
    }
    let _ = writeln!(out, "Fare:     {}", quote_summary(&outcome.quote));
    let _ = writeln!(out, "Charged:  {}", format_money(booking.total_fare));
    let _ = writeln!(
        out,
        "Payment:  {} ({})",
        booking.payment_method, booking.payment_status
    );
    let _ = writeln!(out, "Status:   {}", outcome.state);
    let _ = writeln!(out, "{}", outcome.notice);
    out
}

pub fn stats_report(stats: &AdminStats) -> String {
    let s = &stats.summary;
    let mut out = String::new();
    let _ = writeln!(out, "Total revenue  {}", format_money(s.total_revenue));
    let _ = writeln!(out, "Bookings       {}", s.total_bookings);
    let _ = writeln!(out, "Buses          {}", s.total_buses);
    let _ = writeln!(out, "Users          {}", s.total_users);

    let (online, cash) = revenue_split(s);
    let _ = writeln!(
        out,
        "Online {} {}  Cash {} {}",
        format_money(s.online_revenue),
        format_percent(online),
        format_money(s.cash_revenue),
        format_percent(cash)
    );

    if !stats.monthly_trend.is_empty() {
        let _ = writeln!(out, "\nMonthly revenue");
        let peak = stats
            .monthly_trend
            .iter()
            .map(|m| m.revenue)
            .max()
            .unwrap_or(0);
        for month in &stats.monthly_trend {
            let ratio = if peak == 0 {
                0.0
            } else {
                month.revenue as f64 / peak as f64
            };
            let _ = writeln!(
                out,
                "  {:<6} {} {}",
                month.name,
                bar(ratio),
                format_money(month.revenue)
            );
        }
    }

    if !stats.top_routes.is_empty() {
        let _ = writeln!(out, "\nTop routes");
        for route in &stats.top_routes {
            let _ = writeln!(
                out,
                "  {} -> {}  {} bookings  {}",
                route.origin,
                route.destination,
                route.bookings,
                format_money(route.revenue)
            );
        }
    }

    if !stats.bus_performance.is_empty() {
        let _ = writeln!(out, "\nBus performance");
        for bus in &stats.bus_performance {
            let rate = clamp_percent(bus.occupancy_rate);
            let _ = writeln!(
                out,
                "  {} ({}) {} {}  {}",
                bus.bus_name,
                bus.bus_number,
                bar(rate / 100.0),
                format_percent(rate),
                format_money(bus.total_revenue)
            );
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use busline_shared::models::{BusPerformance, StatsSummary};
    use busline_shared::{Amenities, Stop};
    use chrono::{Duration, TimeZone, Utc};

    fn trip() -> Trip {
        let start = Utc.with_ymd_and_hms(2026, 11, 2, 6, 0, 0).unwrap();
        Trip {
            id: "65f0".to_string(),
            bus_name: "Sea Breeze".to_string(),
            bus_number: "KA19F2020".to_string(),
            name: None,
            stops: vec![Stop::new("Mangaluru", 0), Stop::new("Karwar", 400)],
            starts_at: start,
            ends_at: start + Duration::minutes(390),
            total_seats: 8,
            seats_available: 0,
            base_fare: None,
            is_active: true,
            booked_seats: [1, 2, 3, 4, 5, 6, 7, 8].into_iter().collect(),
            amenities: Amenities {
                has_ac: true,
                has_wifi: false,
            },
        }
    }

    #[test]
    fn test_trip_line_sold_out() {
        let line = trip_line(&trip());
        assert!(line.contains("Mangaluru -> Karwar"));
        assert!(line.contains("6h 30m"));
        assert!(line.ends_with("SOLD OUT"));
    }

    #[test]
    fn test_trip_detail_lists_stops() {
        let detail = trip_detail(&trip());
        assert!(detail.contains("2. Karwar  ₹400"));
        assert!(detail.contains("Amenities: AC"));
    }

    #[test]
    fn test_seat_grid_marks() {
        let mut t = trip();
        t.booked_seats = [2].into_iter().collect();
        t.seats_available = 7;
        let mut map = SeatMap::for_trip(&t);
        map.toggle(3).unwrap();

        let grid = seat_grid(&map);
        let first = grid.lines().next().unwrap();
        assert_eq!(first, "[ 1] [XX] < 3> [ 4]");
        assert_eq!(grid.lines().count(), 2);
    }

    #[test]
    fn test_stats_report_split() {
        let stats = AdminStats {
            summary: StatsSummary {
                total_revenue: 4000,
                online_revenue: 3000,
                cash_revenue: 1000,
                ..Default::default()
            },
            bus_performance: vec![BusPerformance {
                bus_name: "X".to_string(),
                bus_number: "1".to_string(),
                occupancy_rate: 140.0,
                total_revenue: 10,
            }],
            ..Default::default()
        };
        let report = stats_report(&stats);
        assert!(report.contains("₹4,000"));
        assert!(report.contains("75.0%"));
        assert!(report.contains("100.0%"));
    }
}
