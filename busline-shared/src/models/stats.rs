use serde::{Deserialize, Serialize};

// Server-computed summaries for the admin dashboard. Nothing here is
// aggregated on the client.

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StatsSummary {
    pub total_revenue: u64,
    pub total_bookings: u64,
    pub total_buses: u64,
    pub total_users: u64,
    pub online_revenue: u64,
    pub cash_revenue: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MonthlyRevenue {
    pub name: String,
    pub revenue: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouteStat {
    pub origin: String,
    pub destination: String,
    pub bookings: u64,
    pub revenue: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BusPerformance {
    pub bus_name: String,
    pub bus_number: String,
    /// Percent, 0 to 100 as reported by the server
    pub occupancy_rate: f64,
    pub total_revenue: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AdminStats {
    pub summary: StatsSummary,
    pub monthly_trend: Vec<MonthlyRevenue>,
    pub top_routes: Vec<RouteStat>,
    pub bus_performance: Vec<BusPerformance>,
}
